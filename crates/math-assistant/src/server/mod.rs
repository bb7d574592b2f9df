//! The web front end: one page plus the JSON and SSE API it talks to.

mod api;
mod error;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use math_assistant_core::{Agent, AgentError, ModelClient};
use math_assistant_openai_model::OpenAIProvider;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub use error::ApiError;

use crate::config::{API_KEY_VAR, AppConfig};
use crate::session::{Session, SessionError};
use crate::tools::{WikipediaConfig, agent_builder};

/// The page title.
pub const TITLE: &str = "Text To Math Problem Solver and Data Search Assistant";

/// The question the input box starts with.
pub const DEFAULT_QUESTION: &str = "What is the numerical value of pi to 10 decimal places? Please provide only the numerical result, without any code or explanations.";

/// How long a session may go unused before it is ended.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

struct SessionEntry {
    session: Session,
    last_active: Instant,
}

/// State shared by all requests.
pub struct AppState {
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
    agent: Option<Agent>,
    idle_timeout: Duration,
}

impl AppState {
    /// Creates the state. Without an agent, sessions only show a notice.
    pub fn new(agent: Option<Agent>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            agent,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Sets how long a session may go unused before the sweeper ends it.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Creates the state with an agent built from `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, AgentError> {
        let idle_timeout = config.session_idle_timeout;
        let Some(provider_config) = config.provider_config() else {
            warn!("{API_KEY_VAR} is not set, questions will not be answered");
            return Ok(Self::new(None).with_idle_timeout(idle_timeout));
        };
        debug!("using model {}", provider_config.model());

        let model_client = ModelClient::new(OpenAIProvider::new(provider_config));
        let wikipedia = WikipediaConfig::for_language(&config.wikipedia_lang);
        let agent = agent_builder(model_client, wikipedia)
            .max_iterations(config.max_iterations)
            .build()?;
        Ok(Self::new(Some(agent)).with_idle_timeout(idle_timeout))
    }

    /// Spawns a task that periodically ends sessions left unused for longer
    /// than the idle timeout. The task stops once the state is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let state = Arc::downgrade(self);
        let period = (self.idle_timeout / 4).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(state) = state.upgrade() else {
                    break;
                };
                let evicted = state.evict_idle().await;
                if evicted > 0 {
                    debug!("evicted {evicted} idle sessions");
                }
            }
        })
    }

    async fn create_session(&self) -> (Uuid, Session) {
        let id = Uuid::new_v4();
        let session = Session::new(&id.to_string(), self.agent.clone());
        let entry = SessionEntry {
            session: session.clone(),
            last_active: Instant::now(),
        };
        self.sessions.write().await.insert(id, entry);
        debug!(%id, "session created");
        (id, session)
    }

    /// Looks up a session and marks it as used. A session whose actor has
    /// stopped is dropped from the map.
    async fn session(&self, id: Uuid) -> Result<Session, ApiError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&id) {
            Some(entry) if entry.session.is_active() => {
                entry.last_active = Instant::now();
                return Ok(entry.session.clone());
            }
            Some(_) => {}
            None => return Err(ApiError::SessionNotFound(id)),
        }
        sessions.remove(&id);
        debug!(%id, "dropped a stopped session");
        Err(ApiError::Session(SessionError::Ended))
    }

    async fn touch(&self, id: Uuid) {
        if let Some(entry) = self.sessions.write().await.get_mut(&id) {
            entry.last_active = Instant::now();
        }
    }

    async fn remove_session(&self, id: Uuid) -> Result<(), ApiError> {
        let entry = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or(ApiError::SessionNotFound(id))?;
        entry.session.end();
        debug!(%id, "session ended");
        Ok(())
    }

    /// Ends and drops sessions that stopped or went unused for too long.
    async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let idle = now.duration_since(entry.last_active);
            let keep = entry.session.is_active() && idle < self.idle_timeout;
            if !keep {
                entry.session.end();
                debug!(%id, "session evicted after {}s", idle.as_secs());
            }
            keep
        });
        before - sessions.len()
    }
}

/// Returns the application routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(api::index))
        .route("/api/sessions", post(api::create_session))
        .route(
            "/api/sessions/:id",
            get(api::get_session).delete(api::delete_session),
        )
        .route("/api/sessions/:id/ask", post(api::ask))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
