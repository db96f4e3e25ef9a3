use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::eventsource::StreamEvent;

/// Author of a transcript entry. Stored conversations call the assistant `ai`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[serde(alias = "ai")]
    Assistant,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Classification tag owned by the assistant service (`RAG`, `fallback`,
    /// `error`, ...). Not interpreted beyond substring checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            mode: None,
        }
    }

    pub fn assistant(content: impl Into<String>, mode: Option<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            mode,
        }
    }

    /// Assistant messages get a mode badge and actions unless their mode
    /// contains the informational marker.
    pub fn shows_actions(&self, info_marker: &str) -> bool {
        self.role == Role::Assistant
            && !self
                .mode
                .as_deref()
                .is_some_and(|mode| mode.contains(info_marker))
    }
}

/// One `[role, content]` pair of the history sent along with a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry(pub Role, pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// No visible content yet.
    Pending,
    Streaming,
    /// `done` received; the tail no longer changes.
    Finished,
}

/// Reducer state for the response being streamed into the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTail {
    mode: String,
    response: String,
    phase: StreamPhase,
}

impl StreamTail {
    pub fn new(initial_mode: impl Into<String>) -> Self {
        Self {
            mode: initial_mode.into(),
            response: String::new(),
            phase: StreamPhase::Pending,
        }
    }

    /// Applies one event. Once finished, every further event is ignored.
    #[must_use]
    pub fn reduce(mut self, event: StreamEvent) -> Self {
        if self.phase == StreamPhase::Finished {
            debug!("[Stream] Ignoring event after done: {event:?}");
            return self;
        }

        match event {
            StreamEvent::Mode { value } => {
                debug!("[Stream] mode: {value}");
                self.mode = value;
            }
            StreamEvent::Token { value } => {
                self.response.push_str(&value);
                self.phase = StreamPhase::Streaming;
            }
            StreamEvent::Done { full_response } => {
                self.response = full_response;
                self.phase = StreamPhase::Finished;
            }
            StreamEvent::Unknown => {}
        }
        self
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub const fn phase(&self) -> StreamPhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == StreamPhase::Finished
    }

    /// Whether the tail has anything to show in the transcript.
    pub fn is_visible(&self) -> bool {
        self.phase != StreamPhase::Pending
    }

    pub fn into_response(self) -> String {
        self.response
    }
}

/// Ordered chat history. Only the last assistant message is ever mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// History as sent to the assistant.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.messages
            .iter()
            .map(|message| HistoryEntry(message.role, message.content.clone()))
            .collect()
    }

    /// Appends the user's question and the empty assistant message the
    /// response streams into.
    pub fn begin_exchange(&mut self, question: impl Into<String>) {
        self.messages.push(ChatMessage::user(question));
        self.messages.push(ChatMessage::assistant(String::new(), None));
    }

    /// Copies the tail into the in-progress assistant message.
    pub fn project(&mut self, tail: &StreamTail) {
        if !tail.is_visible() {
            return;
        }
        if let Some(last) = self
            .messages
            .last_mut()
            .filter(|message| message.role == Role::Assistant)
        {
            last.content.clear();
            last.content.push_str(tail.response());
            last.mode = Some(tail.mode().to_string());
        }
    }

    /// Records a failed exchange. An untouched placeholder is replaced by the
    /// error message; streamed content is kept and the error follows it.
    pub fn fail_exchange(&mut self, error_text: &str, error_mode: &str) -> &ChatMessage {
        self.discard_placeholder();
        self.messages.push(ChatMessage::assistant(
            error_text,
            Some(error_mode.to_string()),
        ));
        &self.messages[self.messages.len() - 1]
    }

    /// Drops the trailing assistant message if nothing was streamed into it.
    pub fn discard_placeholder(&mut self) -> bool {
        let untouched = self.messages.last().is_some_and(|message| {
            message.role == Role::Assistant && message.content.is_empty() && message.mode.is_none()
        });
        if untouched {
            self.messages.pop();
        }
        untouched
    }
}
