use std::sync::Arc;

use math_assistant_core::tool::{Error as ToolError, Tool, ToolResult};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::ToolKind;

const MAX_QUERY_CHARS: usize = 300;
const NO_RESULT: &str = "No good Wikipedia Search Result was found";
const COMMON_PARAMS: [(&str, &str); 2] =
    [("format", "json"), ("formatversion", "2")];

/// Settings for [`WikipediaTool`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WikipediaConfig {
    /// The MediaWiki `api.php` endpoint.
    pub api_url: String,
    /// How many search hits are summarized.
    pub top_k: usize,
    /// The result is cut to this many characters.
    pub max_chars: usize,
}

impl WikipediaConfig {
    /// Returns the default settings for a language edition.
    pub fn for_language(lang: &str) -> Self {
        Self {
            api_url: format!("https://{lang}.wikipedia.org/w/api.php"),
            top_k: 3,
            max_chars: 4000,
        }
    }
}

impl Default for WikipediaConfig {
    #[inline]
    fn default() -> Self {
        Self::for_language("en")
    }
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    query: Option<T>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ApiError {
    info: String,
}

#[derive(Default, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Default, Deserialize)]
struct PagesQuery {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    extract: Option<String>,
    #[serde(default)]
    pageprops: serde_json::Map<String, serde_json::Value>,
}

/// Searches Wikipedia and returns the intro of the top pages.
pub struct WikipediaTool {
    client: Client,
    config: Arc<WikipediaConfig>,
}

impl WikipediaTool {
    /// Creates a tool with its own HTTP client.
    #[inline]
    pub fn new(config: WikipediaConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Creates a tool sharing an existing HTTP client.
    #[inline]
    pub fn with_client(client: Client, config: WikipediaConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }
}

impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        ToolKind::Search.name()
    }

    fn description(&self) -> &str {
        ToolKind::Search.description()
    }

    fn execute(
        &self,
        input: String,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        let config = Arc::clone(&self.config);
        async move { search_and_summarize(&client, &config, &input).await }
    }
}

async fn search_and_summarize(
    client: &Client,
    config: &WikipediaConfig,
    query: &str,
) -> ToolResult {
    let query: String = query.chars().take(MAX_QUERY_CHARS).collect();
    if query.trim().is_empty() {
        return Ok(NO_RESULT.to_owned());
    }

    let limit = config.top_k.to_string();
    let hits: SearchQuery = api_query(
        client,
        config,
        &[
            ("action", "query"),
            ("list", "search"),
            ("srsearch", &query),
            ("srlimit", &limit),
            ("srprop", ""),
        ],
    )
    .await?;
    debug!("found {} Wikipedia pages for {query:?}", hits.search.len());

    let mut summaries = vec![];
    for hit in hits.search.iter().take(config.top_k) {
        let pages: PagesQuery = api_query(
            client,
            config,
            &[
                ("action", "query"),
                ("prop", "extracts|pageprops"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", &hit.title),
            ],
        )
        .await?;
        match pages.pages.into_iter().next() {
            Some(page) if page.missing || page.invalid => {
                debug!("skipping missing page {:?}", hit.title);
            }
            Some(page) if page.pageprops.contains_key("disambiguation") => {
                debug!("skipping disambiguation page {:?}", page.title);
            }
            Some(page) => summaries.push(format!(
                "Page: {}\nSummary: {}",
                page.title,
                page.extract.unwrap_or_default()
            )),
            None => debug!("no page returned for {:?}", hit.title),
        }
    }

    if summaries.is_empty() {
        return Ok(NO_RESULT.to_owned());
    }
    Ok(summaries.join("\n\n").chars().take(config.max_chars).collect())
}

async fn api_query<T: DeserializeOwned + Default>(
    client: &Client,
    config: &WikipediaConfig,
    params: &[(&str, &str)],
) -> Result<T, ToolError> {
    let mut query: Vec<(&str, &str)> = COMMON_PARAMS.to_vec();
    query.extend_from_slice(params);
    let url = Url::parse_with_params(&config.api_url, &query).map_err(|err| {
        ToolError::execution_error(format!("invalid Wikipedia API URL: {err}"))
    })?;
    trace!("GET {url}");

    let unavailable = |err: reqwest::Error| {
        ToolError::unavailable(format!("Wikipedia request failed: {err}"))
    };
    let resp = client
        .get(url)
        .send()
        .await
        .and_then(|resp| resp.error_for_status())
        .map_err(unavailable)?;
    let body: ApiResponse<T> = resp.json().await.map_err(|err| {
        let reason = format!("unexpected Wikipedia response: {err}");
        ToolError::execution_error(reason)
    })?;

    if let Some(error) = body.error {
        let reason = format!("Wikipedia API error: {}", error.info);
        return Err(ToolError::execution_error(reason));
    }
    Ok(body.query.unwrap_or_default())
}
