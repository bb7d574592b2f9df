#[cfg(test)]
use std::collections::VecDeque;
use std::fmt::{self, Display};

use bytes::Bytes;
use reqwest::Response;

/// Failure while reading the response body.
#[derive(Debug, PartialEq, Eq)]
pub struct Error(String);

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to read response body: {}", self.0)
    }
}

enum Source {
    Body(Response),
    #[cfg(test)]
    Buffered(VecDeque<Bytes>),
}

/// Reads a body piece by piece and counts the bytes received.
pub struct Chunks {
    source: Source,
    received: usize,
}

impl Chunks {
    pub fn from_response(response: Response) -> Self {
        Self::with_source(Source::Body(response))
    }

    #[cfg(test)]
    pub fn from_buffered(chunks: impl IntoIterator<Item = Bytes>) -> Self {
        Self::with_source(Source::Buffered(chunks.into_iter().collect()))
    }

    fn with_source(source: Source) -> Self {
        Self {
            source,
            received: 0,
        }
    }

    /// Returns `None` once the body is exhausted.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        let chunk = match &mut self.source {
            Source::Body(response) => {
                response.chunk().await.map_err(|err| Error(err.to_string()))?
            }
            #[cfg(test)]
            Source::Buffered(chunks) => chunks.pop_front(),
        };
        match &chunk {
            Some(bytes) => self.received += bytes.len(),
            None => trace!("response body ended after {} bytes", self.received),
        }
        Ok(chunk)
    }
}
