use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::response::sse::{Event, KeepAlive, Sse};
use math_assistant_core::AgentEvent;
use math_assistant_core::conversation::Message as ChatMessage;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{Stream, StreamExt};
use uuid::Uuid;

use super::{ApiError, AppState, DEFAULT_QUESTION, TITLE};
use crate::session::{Session, SubmitOutcome};

#[derive(Debug, Serialize)]
pub struct SessionView {
    id: Uuid,
    title: &'static str,
    default_question: &'static str,
    messages: Vec<ChatMessage>,
    notice: Option<String>,
    busy: bool,
}

impl SessionView {
    async fn of(id: Uuid, session: &Session) -> Result<Self, ApiError> {
        let snapshot = session.snapshot().await?;
        Ok(Self {
            id,
            title: TITLE,
            default_question: DEFAULT_QUESTION,
            messages: snapshot.messages,
            notice: snapshot.notice,
            busy: snapshot.busy,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    question: String,
}

pub async fn index() -> Html<&'static str> {
    Html(include_str!("../../assets/index.html"))
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let (id, session) = state.create_session().await;
    let view = SessionView::of(id, &session).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let session = state.session(id).await?;
    Ok(Json(SessionView::of(id, &session).await?))
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.remove_session(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Streams `step` events while the agent runs, then exactly one of
/// `answer`, `warning`, `notice` or `error`.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<AskRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let session = state.session(id).await?;
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let on_event = {
        let event_tx = event_tx.clone();
        move |event: AgentEvent| send_event(&event_tx, "step", &event)
    };
    tokio::spawn(async move {
        let outcome = session.submit(&req.question, on_event).await;
        // Finishing a run counts as use.
        state.touch(id).await;
        match outcome {
            Ok(SubmitOutcome::Answered(message)) => {
                send_event(&event_tx, "answer", &message);
            }
            Ok(SubmitOutcome::Rejected(warning)) => {
                let data = json!({ "message": warning });
                send_event(&event_tx, "warning", &data);
            }
            Ok(SubmitOutcome::Unavailable(notice)) => {
                let data = json!({ "message": notice });
                send_event(&event_tx, "notice", &data);
            }
            Err(err) => {
                send_event(
                    &event_tx,
                    "error",
                    &json!({ "message": err.to_string() }),
                );
            }
        }
    });

    let stream =
        UnboundedReceiverStream::new(event_rx).map(Ok::<_, Infallible>);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn send_event<T: Serialize>(
    tx: &UnboundedSender<Event>,
    name: &str,
    data: &T,
) {
    match Event::default().event(name).json_data(data) {
        Ok(event) => {
            trace!("sse event: {name}");
            // The client may have gone away; the run continues regardless.
            tx.send(event).ok();
        }
        Err(err) => error!("failed to serialize {name} event: {err}"),
    }
}
