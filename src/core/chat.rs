use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, error, warn};
use tokio_util::sync::CancellationToken;

use crate::api::Conversation;
use crate::core::transcript::{ChatMessage, HistoryEntry, StreamTail, Transcript};
use crate::core::{ClientError, Config};
use crate::eventsource::EventStream;

/// Mode tag of the synthetic message shown when an exchange fails.
pub const ERROR_MODE: &str = "error";

/// Source of streamed answers.
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    /// Starts answering `question`. Fails without yielding anything when
    /// the service rejects the request.
    async fn ask(&self, question: &str, history: &[HistoryEntry])
        -> Result<EventStream, ClientError>;
}

/// Where finished exchanges are saved.
#[async_trait]
pub trait ConversationBackend: Send + Sync {
    async fn create_conversation(
        &self,
        message: &str,
        ai_response: &str,
    ) -> Result<Conversation, ClientError>;

    async fn append_messages(
        &self,
        conversation_id: i64,
        user_message: &str,
        ai_response: &str,
    ) -> Result<(), ClientError>;

    async fn load_messages(&self, conversation_id: i64) -> Result<Vec<ChatMessage>, ClientError>;
}

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub default_mode: String,
    pub error_message: String,
}

impl From<&Config> for ChatSettings {
    fn from(config: &Config) -> Self {
        Self {
            default_mode: config.default_mode.clone(),
            error_message: config.error_message.clone(),
        }
    }
}

/// Change to the transcript a renderer should reflect.
#[derive(Debug, Clone, Copy)]
pub enum TranscriptUpdate<'a> {
    /// The in-progress assistant message grew or was finalized.
    Progress(&'a ChatMessage),
    /// The exchange failed; this error message was appended.
    Failed(&'a ChatMessage),
}

#[derive(Debug)]
pub enum StreamOutcome {
    Completed { response: String, mode: String },
    Failed(ClientError),
    Cancelled,
}

/// One chat window: the transcript, the conversation it belongs to, and the
/// backends it talks to. `send` borrows the session mutably, so at most one
/// stream is active per session.
pub struct ChatSession {
    assistant: Box<dyn AssistantBackend>,
    conversations: Box<dyn ConversationBackend>,
    settings: ChatSettings,
    transcript: Transcript,
    active_conversation: Option<i64>,
}

impl ChatSession {
    pub fn new(
        assistant: Box<dyn AssistantBackend>,
        conversations: Box<dyn ConversationBackend>,
        settings: ChatSettings,
    ) -> Self {
        Self {
            assistant,
            conversations,
            settings,
            transcript: Transcript::new(),
            active_conversation: None,
        }
    }

    pub const fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub const fn active_conversation(&self) -> Option<i64> {
        self.active_conversation
    }

    /// Forgets the transcript; the next exchange creates a new conversation.
    pub fn start_new(&mut self) {
        self.transcript.clear();
        self.active_conversation = None;
    }

    /// Replaces the transcript with a stored conversation. On failure the
    /// transcript holds a single error message.
    pub async fn open(&mut self, conversation_id: i64) -> Result<(), ClientError> {
        if self.active_conversation == Some(conversation_id) && !self.transcript.is_empty() {
            return Ok(());
        }
        self.active_conversation = Some(conversation_id);
        self.transcript.clear();

        match self.conversations.load_messages(conversation_id).await {
            Ok(messages) => {
                self.transcript = Transcript::from_messages(messages);
                Ok(())
            }
            Err(e) => {
                self.transcript.push(ChatMessage::assistant(
                    "Error while loading messages.",
                    Some(ERROR_MODE.to_string()),
                ));
                Err(e)
            }
        }
    }

    /// Sends one question and streams the answer into the transcript,
    /// calling `on_update` after every visible change.
    ///
    /// Transport and HTTP failures are not returned as `Err`: they end up in
    /// the transcript and in [`StreamOutcome::Failed`]. Only input that is
    /// rejected before any request is an `Err`.
    pub async fn send<F>(
        &mut self,
        input: &str,
        cancel: &CancellationToken,
        mut on_update: F,
    ) -> Result<StreamOutcome, ClientError>
    where
        F: FnMut(TranscriptUpdate<'_>),
    {
        let question = input.trim();
        if question.is_empty() {
            return Err(ClientError::Validation("Message must not be empty".to_string()));
        }

        let history = self.transcript.history();
        self.transcript.begin_exchange(question);
        debug!(
            "[Chat] question sent with {} history entries, conversation {:?}",
            history.len(),
            self.active_conversation
        );

        let asked = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = self.assistant.ask(question, &history) => Some(result),
        };
        let mut stream = match asked {
            None => return Ok(self.cancelled()),
            Some(Err(e)) => return Ok(self.fail(e, &mut on_update)),
            Some(Ok(stream)) => stream,
        };

        let mut tail = StreamTail::new(self.settings.default_mode.clone());
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                item = stream.next() => Some(item),
            };

            match next {
                None => return Ok(self.cancelled()),
                Some(None) => break,
                Some(Some(Err(e))) => return Ok(self.fail(e, &mut on_update)),
                Some(Some(Ok(event))) => {
                    tail = tail.reduce(event);
                    if tail.is_visible() {
                        self.transcript.project(&tail);
                        if let Some(last) = self.transcript.last() {
                            on_update(TranscriptUpdate::Progress(last));
                        }
                    }
                    if tail.is_finished() {
                        break;
                    }
                }
            }
        }
        drop(stream);

        let mode = tail.mode().to_string();
        let response = tail.into_response();
        if response.is_empty() {
            debug!("[Chat] empty response, nothing to save");
        } else {
            self.save_exchange(question, &response).await;
        }

        Ok(StreamOutcome::Completed { response, mode })
    }

    /// Saves a finished exchange. Failures are logged only.
    async fn save_exchange(&mut self, question: &str, response: &str) {
        match self.active_conversation {
            Some(conversation_id) => {
                if let Err(e) = self
                    .conversations
                    .append_messages(conversation_id, question, response)
                    .await
                {
                    error!("[Chat] failed to save exchange to conversation {conversation_id}: {e}");
                }
            }
            None => match self.conversations.create_conversation(question, response).await {
                Ok(conversation) => {
                    debug!("[Chat] created conversation {}", conversation.id);
                    self.active_conversation = Some(conversation.id);
                }
                Err(e) => error!("[Chat] failed to create conversation: {e}"),
            },
        }
    }

    fn fail<F>(&mut self, error: ClientError, on_update: &mut F) -> StreamOutcome
    where
        F: FnMut(TranscriptUpdate<'_>),
    {
        warn!("[Chat] exchange failed: {error}");
        let message = self
            .transcript
            .fail_exchange(&self.settings.error_message, ERROR_MODE);
        on_update(TranscriptUpdate::Failed(message));
        StreamOutcome::Failed(error)
    }

    fn cancelled(&mut self) -> StreamOutcome {
        debug!("[Chat] exchange cancelled");
        self.transcript.discard_placeholder();
        StreamOutcome::Cancelled
    }
}
