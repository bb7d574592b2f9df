use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidPayload,
}

/// A type for reading server-sent events from a chunk stream.
///
/// Only the `data` field is surfaced. Comments and the other fields
/// (`event`, `id`, `retry`) are skipped, and events without data are
/// dropped entirely.
pub struct Sse {
    buf: Vec<u8>,
    chunks: Chunks,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            chunks,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // Drain complete events already in the buffer before touching
            // the network again.
            if let Some(event) = self.try_parse_event()? {
                return Ok(Some(event));
            }

            let Some(bytes) =
                self.chunks.next_chunk().await.map_err(Error::ChunksError)?
            else {
                // An unterminated trailing event is discarded.
                return Ok(None);
            };
            // Line endings are normalized to `\n`. Payloads are JSON, which
            // never carries a raw carriage return.
            self.buf.extend(bytes.iter().copied().filter(|b| *b != b'\r'));
        }
    }

    fn try_parse_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            let Some(eol_idx) = self.buf.windows(2).position(|w| w == b"\n\n")
            else {
                return Ok(None);
            };
            let block: Vec<u8> = self.buf.drain(..eol_idx + 2).collect();
            let Ok(block) = str::from_utf8(&block[..eol_idx]) else {
                return Err(Error::InvalidPayload);
            };

            let mut data: Option<String> = None;
            for line in block.split('\n') {
                if line.is_empty() || line.starts_with(':') {
                    continue;
                }
                let (field, value) = match line.split_once(':') {
                    Some((field, value)) => {
                        (field, value.strip_prefix(' ').unwrap_or(value))
                    }
                    None => (line, ""),
                };
                if field != "data" {
                    continue;
                }
                match &mut data {
                    Some(data) => {
                        data.push('\n');
                        data.push_str(value);
                    }
                    None => data = Some(value.to_owned()),
                }
            }

            if let Some(data) = data {
                return Ok(Some(data));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn sse_from(chunks: &[&'static [u8]]) -> Sse {
        let chunks = chunks.iter().map(|&c| Bytes::from_static(c));
        Sse::new(Chunks::from_buffered(chunks))
    }

    #[tokio::test]
    async fn test_normal_events() {
        let mut sse = sse_from(&[b"data: hello\n\n", b"data: bye\n\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "bye");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_split_across_chunks() {
        let mut sse = sse_from(&[b"data:", b" hel", b"lo\n", b"\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_multibyte_split_across_chunks() {
        // "π" is 0xCF 0x80 in UTF-8.
        let mut sse = sse_from(&[b"data: \xCF", b"\x80\n\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "π");
    }

    #[tokio::test]
    async fn test_crlf_comments_and_fields() {
        let mut sse = sse_from(&[
            b": keep-alive\r\n\r\n",
            b"event: message\r\nid: 7\r\ndata: a\r\ndata: b\r\n\r\n",
        ]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "a\nb");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_incomplete_and_invalid_data() {
        let mut sse = sse_from(&[b"data: hello\n"]);
        assert_eq!(sse.next_event().await.unwrap(), None);

        let mut sse = sse_from(&[b"data: \xFF\xFE\n\n"]);
        assert_eq!(sse.next_event().await.unwrap_err(), Error::InvalidPayload);
    }
}
