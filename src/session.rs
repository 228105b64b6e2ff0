//! Chat session state for one user working with one document at a time.
//!
//! [`Session`] is a single aggregate whose fields only change through [`Session::apply`]. Each
//! upload and each clear starts a new epoch; results tagged with an older epoch are dropped,
//! so a summary or answer that lands after the user moved on can never mix with the new
//! document's transcript.
//!
//! [`SessionHandle`] drives the pipeline on behalf of a caller (HTTP handlers, the CLI REPL)
//! and applies the matching transitions around each call.

use crate::pipeline::{DocumentContext, IngestOutcome, PipelineApi, PipelineError, RawDocument};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// Person asking questions.
    User,
    /// Model-generated answer.
    Assistant,
}

/// One entry of the chat transcript. Never edited after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Unique message identifier.
    pub id: Uuid,
    /// Author of the message.
    pub sender: Sender,
    /// Message text.
    pub text: String,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl ChatMessage {
    fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            text: text.into(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Message typed by the user.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    /// Answer returned by the model.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, text)
    }
}

/// State changes accepted by [`Session::apply`].
#[derive(Debug, Clone)]
pub enum Transition {
    /// A new upload began: starts a new epoch with only the document name set.
    UploadStarted {
        /// Filename of the upload.
        name: String,
    },
    /// The upload produced a summary.
    DocumentReady {
        /// Epoch the upload started in.
        epoch: u64,
        /// Summary grounding the chat.
        context: DocumentContext,
    },
    /// The upload failed; name and summary are cleared.
    DocumentFailed {
        /// Epoch the upload started in.
        epoch: u64,
        /// User-facing error text.
        message: String,
    },
    /// The user's question was accepted and appended.
    QuestionSent {
        /// The user's message.
        message: ChatMessage,
    },
    /// The model answered.
    AnswerReceived {
        /// Epoch the question was asked in.
        epoch: u64,
        /// The assistant's message.
        message: ChatMessage,
    },
    /// Answering failed; the transcript is left untouched.
    AnswerFailed {
        /// Epoch the question was asked in.
        epoch: u64,
        /// User-facing error text.
        message: String,
    },
    /// Everything is reset.
    Cleared,
}

/// Document, summary, transcript, and error state for one session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Session {
    document_name: Option<String>,
    context: Option<DocumentContext>,
    messages: Vec<ChatMessage>,
    document_error: Option<String>,
    chat_error: Option<String>,
    upload_in_flight: bool,
    chat_in_flight: bool,
    epoch: u64,
}

impl Session {
    /// Apply a transition. Returns `false` when it was dropped as stale.
    pub fn apply(&mut self, transition: Transition) -> bool {
        match transition {
            Transition::UploadStarted { name } => {
                *self = Self {
                    document_name: Some(name),
                    upload_in_flight: true,
                    epoch: self.epoch + 1,
                    ..Self::default()
                };
            }
            Transition::DocumentReady { epoch, context } => {
                if epoch != self.epoch {
                    return false;
                }
                self.context = Some(context);
                self.upload_in_flight = false;
            }
            Transition::DocumentFailed { epoch, message } => {
                if epoch != self.epoch {
                    return false;
                }
                self.document_name = None;
                self.context = None;
                self.document_error = Some(message);
                self.upload_in_flight = false;
            }
            Transition::QuestionSent { message } => {
                self.messages.push(message);
                self.chat_error = None;
                self.chat_in_flight = true;
            }
            Transition::AnswerReceived { epoch, message } => {
                if epoch != self.epoch {
                    return false;
                }
                self.messages.push(message);
                self.chat_in_flight = false;
            }
            Transition::AnswerFailed { epoch, message } => {
                if epoch != self.epoch {
                    return false;
                }
                self.chat_error = Some(message);
                self.chat_in_flight = false;
            }
            Transition::Cleared => {
                *self = Self {
                    epoch: self.epoch + 1,
                    ..Self::default()
                };
            }
        }
        true
    }

    /// Filename of the current document.
    pub fn document_name(&self) -> Option<&str> {
        self.document_name.as_deref()
    }

    /// Summary grounding the chat, once the upload succeeded.
    pub fn context(&self) -> Option<&DocumentContext> {
        self.context.as_ref()
    }

    /// Transcript in send order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Last upload failure.
    pub fn document_error(&self) -> Option<&str> {
        self.document_error.as_deref()
    }

    /// Last answer failure.
    pub fn chat_error(&self) -> Option<&str> {
        self.chat_error.as_deref()
    }

    /// Whether an upload is being processed.
    pub fn is_uploading(&self) -> bool {
        self.upload_in_flight
    }

    /// Whether a question is awaiting its answer.
    pub fn is_answering(&self) -> bool {
        self.chat_in_flight
    }

    /// Current epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Errors returned by [`SessionHandle`] operations.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The same kind of operation is already in flight.
    #[error("{0} already in progress")]
    Busy(&'static str),
    /// The pipeline rejected the request.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

const UPLOAD_ABANDONED: &str = "The upload was interrupted before it finished. Please upload again.";
const QUESTION_ABANDONED: &str = "The question was interrupted before it was answered. Please ask again.";

/// Settles an in-flight call whose future is dropped before its result is applied.
///
/// Holds the failure transition for the call's epoch; [`InFlight::settle`] disarms it once
/// the real outcome is applied.
struct InFlight {
    inner: Arc<Mutex<Session>>,
    abandoned: Option<Transition>,
}

impl InFlight {
    fn new(inner: &Arc<Mutex<Session>>, abandoned: Transition) -> Self {
        Self {
            inner: inner.clone(),
            abandoned: Some(abandoned),
        }
    }

    fn settle(&mut self) {
        self.abandoned = None;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let Some(transition) = self.abandoned.take() else {
            return;
        };
        tracing::warn!("Session call dropped before completion; releasing it");
        match self.inner.try_lock() {
            Ok(mut session) => {
                session.apply(transition);
            }
            Err(_) => {
                let inner = self.inner.clone();
                if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                    runtime.spawn(async move {
                        inner.lock().await.apply(transition);
                    });
                }
            }
        }
    }
}

/// Shared, lockable session driven through the pipeline.
#[derive(Clone, Default)]
pub struct SessionHandle {
    inner: Arc<Mutex<Session>>,
}

impl SessionHandle {
    /// Create a handle to an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> Session {
        self.inner.lock().await.clone()
    }

    /// Reset the session. Results of calls still in flight are discarded when they land.
    pub async fn clear(&self) {
        self.inner.lock().await.apply(Transition::Cleared);
        tracing::info!("Session cleared");
    }

    /// Replace the current document with `document`.
    ///
    /// The previous summary and transcript are dropped before the pipeline runs. On failure
    /// the document name is cleared and the error recorded. The outcome is returned even when
    /// the session moved on in the meantime, in which case it is not applied.
    pub async fn upload<P>(
        &self,
        pipeline: &P,
        document: RawDocument,
    ) -> Result<IngestOutcome, SessionError>
    where
        P: PipelineApi + ?Sized,
    {
        let epoch = {
            let mut session = self.inner.lock().await;
            if session.upload_in_flight {
                return Err(SessionError::Busy("upload"));
            }
            session.apply(Transition::UploadStarted {
                name: document.name.clone(),
            });
            session.epoch
        };
        let mut in_flight = InFlight::new(
            &self.inner,
            Transition::DocumentFailed {
                epoch,
                message: UPLOAD_ABANDONED.to_string(),
            },
        );

        let result = pipeline.ingest(document).await;

        let mut session = self.inner.lock().await;
        in_flight.settle();
        match result {
            Ok(outcome) => {
                let applied = session.apply(Transition::DocumentReady {
                    epoch,
                    context: outcome.context.clone(),
                });
                if !applied {
                    tracing::debug!(epoch, "Discarding summary for a superseded upload");
                }
                Ok(outcome)
            }
            Err(error) => {
                session.apply(Transition::DocumentFailed {
                    epoch,
                    message: error.user_message(),
                });
                Err(error.into())
            }
        }
    }

    /// Ask a question about the current document.
    ///
    /// Blank questions and questions without a loaded summary are rejected before anything
    /// is appended. Otherwise the user message is appended first and the answer after it; a
    /// failed answer leaves the user message in place and sets the chat error.
    pub async fn send_message<P>(&self, pipeline: &P, text: &str) -> Result<ChatMessage, SessionError>
    where
        P: PipelineApi + ?Sized,
    {
        let question = text.trim();
        let (epoch, context) = {
            let mut session = self.inner.lock().await;
            if session.chat_in_flight {
                return Err(SessionError::Busy("chat"));
            }
            if question.is_empty() {
                return Err(PipelineError::EmptyQuestion.into());
            }
            let Some(context) = session.context.clone() else {
                return Err(PipelineError::EmptyContext.into());
            };
            session.apply(Transition::QuestionSent {
                message: ChatMessage::user(question),
            });
            (session.epoch, context)
        };
        let mut in_flight = InFlight::new(
            &self.inner,
            Transition::AnswerFailed {
                epoch,
                message: QUESTION_ABANDONED.to_string(),
            },
        );

        let result = pipeline.ask(&context.summary, question).await;

        let mut session = self.inner.lock().await;
        in_flight.settle();
        match result {
            Ok(answer) => {
                let message = ChatMessage::assistant(answer);
                session.apply(Transition::AnswerReceived {
                    epoch,
                    message: message.clone(),
                });
                Ok(message)
            }
            Err(error) => {
                session.apply(Transition::AnswerFailed {
                    epoch,
                    message: error.user_message(),
                });
                Err(error.into())
            }
        }
    }
}
