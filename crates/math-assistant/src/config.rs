//! Startup configuration, read once from the environment and an optional
//! secrets file.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};

use math_assistant_openai_model::{
    DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAIConfig, OpenAIConfigBuilder,
};

/// The variable holding the model API key.
pub const API_KEY_VAR: &str = "GROQ_API_KEY";

const MODEL_VAR: &str = "GROQ_MODEL";
const TEMPERATURE_VAR: &str = "GROQ_TEMPERATURE";
const BASE_URL_VAR: &str = "GROQ_BASE_URL";
const ADDR_VAR: &str = "MATH_ASSISTANT_ADDR";
const SECRETS_VAR: &str = "MATH_ASSISTANT_SECRETS";
const MAX_ITERATIONS_VAR: &str = "MATH_ASSISTANT_MAX_ITERATIONS";
const WIKIPEDIA_LANG_VAR: &str = "WIKIPEDIA_LANG";
const SESSION_IDLE_VAR: &str = "MATH_ASSISTANT_SESSION_IDLE_SECS";

const DEFAULT_ADDR: &str = "127.0.0.1:8501";
const DEFAULT_SECRETS_PATH: &str = ".secrets.toml";
const DEFAULT_MAX_ITERATIONS: usize = 15;
const DEFAULT_WIKIPEDIA_LANG: &str = "en";
const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);

/// Errors that abort startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The secrets file exists but could not be read.
    #[error("failed to read secrets file {}: {source}", path.display())]
    ReadSecrets {
        /// The secrets file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
    /// The secrets file is not valid TOML.
    #[error("malformed secrets file {}: {source}", path.display())]
    ParseSecrets {
        /// The secrets file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: toml::de::Error,
    },
    /// A variable is set to something unusable.
    #[error("invalid value for {var}: {reason}")]
    InvalidValue {
        /// The variable name.
        var: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// String secrets loaded from a TOML table.
///
/// Non-string values are ignored.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretStore {
    secrets: HashMap<String, String>,
}

impl SecretStore {
    /// Loads the secrets file at `path`. A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("no secrets file at {}", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::ReadSecrets {
                    path: path.to_owned(),
                    source,
                });
            }
        };
        Self::parse(&text).map_err(|source| ConfigError::ParseSecrets {
            path: path.to_owned(),
            source,
        })
    }

    /// Parses secrets from TOML text.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        let table: toml::Table = toml::from_str(text)?;
        let secrets = table
            .into_iter()
            .filter_map(|(key, value)| match value {
                toml::Value::String(value) => Some((key, value)),
                _ => None,
            })
            .collect();
        Ok(Self { secrets })
    }

    /// Returns the secret named `key`.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.secrets.get(key).map(String::as_str)
    }
}

impl fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.secrets.keys().collect();
        keys.sort();
        f.debug_struct("SecretStore").field("keys", &keys).finish()
    }
}

/// Resolves the API key, preferring the secrets file over the environment.
///
/// Empty values count as absent.
pub fn resolve_api_key(
    store: &SecretStore,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    store
        .get(API_KEY_VAR)
        .filter(|key| !key.is_empty())
        .map(str::to_owned)
        .or_else(|| lookup(API_KEY_VAR).filter(|key| !key.is_empty()))
}

/// Application configuration.
#[derive(Clone, PartialEq)]
pub struct AppConfig {
    /// The model API key, if any.
    pub api_key: Option<String>,
    /// The model identifier.
    pub model: String,
    /// The sampling temperature. The server default applies if unset.
    pub temperature: Option<f32>,
    /// The OpenAI-compatible API base URL.
    pub base_url: String,
    /// The address the server listens on.
    pub addr: SocketAddr,
    /// The agent iteration limit.
    pub max_iterations: usize,
    /// The Wikipedia language edition.
    pub wikipedia_lang: String,
    /// How long a session may go unused before it is ended.
    pub session_idle_timeout: Duration,
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|value| !value.is_empty());

        let secrets_path = get(SECRETS_VAR)
            .unwrap_or_else(|| DEFAULT_SECRETS_PATH.to_owned());
        let store = SecretStore::load(Path::new(&secrets_path))?;
        let api_key = resolve_api_key(&store, &lookup);

        let addr = get(ADDR_VAR).unwrap_or_else(|| DEFAULT_ADDR.to_owned());
        let addr = addr.parse().map_err(|err| ConfigError::InvalidValue {
            var: ADDR_VAR,
            reason: format!("{addr:?}: {err}"),
        })?;

        let max_iterations = match get(MAX_ITERATIONS_VAR) {
            Some(value) => parse_max_iterations(&value)?,
            None => DEFAULT_MAX_ITERATIONS,
        };
        let temperature = match get(TEMPERATURE_VAR) {
            Some(value) => Some(parse_temperature(&value)?),
            None => None,
        };
        let session_idle_timeout = match get(SESSION_IDLE_VAR) {
            Some(value) => parse_idle_timeout(&value)?,
            None => DEFAULT_SESSION_IDLE,
        };

        Ok(Self {
            api_key,
            model: get(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            temperature,
            base_url: get(BASE_URL_VAR)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            addr,
            max_iterations,
            wikipedia_lang: get(WIKIPEDIA_LANG_VAR)
                .unwrap_or_else(|| DEFAULT_WIKIPEDIA_LANG.to_owned()),
            session_idle_timeout,
        })
    }

    /// Returns the provider configuration, or `None` without an API key.
    pub fn provider_config(&self) -> Option<OpenAIConfig> {
        let api_key = self.api_key.as_ref()?;
        let mut builder = OpenAIConfigBuilder::with_api_key(api_key.clone())
            .with_model(self.model.clone())
            .with_base_url(self.base_url.clone());
        if let Some(temperature) = self.temperature {
            builder = builder.with_temperature(temperature);
        }
        Some(builder.build())
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("base_url", &self.base_url)
            .field("addr", &self.addr)
            .field("max_iterations", &self.max_iterations)
            .field("wikipedia_lang", &self.wikipedia_lang)
            .field("session_idle_timeout", &self.session_idle_timeout)
            .finish()
    }
}

fn parse_max_iterations(value: &str) -> Result<usize, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        var: MAX_ITERATIONS_VAR,
        reason,
    };
    match value.parse::<usize>() {
        Ok(0) => Err(invalid("must be at least 1".to_owned())),
        Ok(n) => Ok(n),
        Err(err) => Err(invalid(format!("{value:?}: {err}"))),
    }
}

fn parse_temperature(value: &str) -> Result<f32, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        var: TEMPERATURE_VAR,
        reason,
    };
    match value.parse::<f32>() {
        Ok(t) if (0.0..=2.0).contains(&t) => Ok(t),
        Ok(_) => Err(invalid(format!("{value:?} is outside 0 to 2"))),
        Err(err) => Err(invalid(format!("{value:?}: {err}"))),
    }
}

fn parse_idle_timeout(value: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        var: SESSION_IDLE_VAR,
        reason,
    };
    match value.parse::<u64>() {
        Ok(0) => Err(invalid("must be at least 1".to_owned())),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(err) => Err(invalid(format!("{value:?}: {err}"))),
    }
}
