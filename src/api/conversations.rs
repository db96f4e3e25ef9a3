use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::http::{Ack, ApiClient};
use crate::core::chat::ConversationBackend;
use crate::core::transcript::{ChatMessage, Role};
use crate::core::{validation, ClientError};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub is_pinned: bool,
}

/// A message as stored by the conversation service.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub sender: Role,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl From<StoredMessage> for ChatMessage {
    fn from(message: StoredMessage) -> Self {
        Self {
            role: message.sender,
            content: message.content,
            mode: None,
        }
    }
}

#[derive(Serialize)]
struct CreateConversation<'a> {
    message: &'a str,
    ai_response: &'a str,
}

#[derive(Serialize)]
struct AppendMessages<'a> {
    user_message: &'a str,
    ai_response: &'a str,
}

#[derive(Serialize)]
struct Rename<'a> {
    title: &'a str,
}

/// Client for the conversation endpoints of the auth service.
pub struct ConversationClient {
    api: ApiClient,
}

impl ConversationClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Conversations of the current user, pinned first then newest first.
    pub async fn list(&self) -> Result<Vec<Conversation>, ClientError> {
        self.api.get_json("/conversations/").await
    }

    pub async fn messages(&self, conversation_id: i64) -> Result<Vec<StoredMessage>, ClientError> {
        self.api
            .get_json(&format!("/conversations/{conversation_id}/messages"))
            .await
    }

    /// Creates a conversation from its first exchange. The service derives
    /// the title from the first message.
    pub async fn create(&self, message: &str, ai_response: &str) -> Result<Conversation, ClientError> {
        self.api
            .post_json(
                "/conversations/",
                &CreateConversation {
                    message,
                    ai_response,
                },
            )
            .await
    }

    pub async fn append(
        &self,
        conversation_id: i64,
        user_message: &str,
        ai_response: &str,
    ) -> Result<(), ClientError> {
        let _: Ack = self
            .api
            .post_json(
                &format!("/conversations/{conversation_id}/messages"),
                &AppendMessages {
                    user_message,
                    ai_response,
                },
            )
            .await?;
        Ok(())
    }

    pub async fn rename(&self, conversation_id: i64, title: &str) -> Result<Conversation, ClientError> {
        validation::validate_title(title)?;
        self.api
            .put_json(
                &format!("/conversations/{conversation_id}/rename"),
                &Rename {
                    title: title.trim(),
                },
            )
            .await
    }

    /// Toggles the pinned flag.
    pub async fn toggle_pin(&self, conversation_id: i64) -> Result<Conversation, ClientError> {
        let response = self
            .api
            .send(
                self.api
                    .request(Method::PUT, &format!("/conversations/{conversation_id}/pin")),
            )
            .await?;
        Ok(response.json().await?)
    }

    pub async fn delete(&self, conversation_id: i64) -> Result<String, ClientError> {
        let ack: Ack = self
            .api
            .delete_json(&format!("/conversations/{conversation_id}"))
            .await?;
        Ok(ack.message)
    }
}

#[async_trait]
impl ConversationBackend for ConversationClient {
    async fn create_conversation(
        &self,
        message: &str,
        ai_response: &str,
    ) -> Result<Conversation, ClientError> {
        self.create(message, ai_response).await
    }

    async fn append_messages(
        &self,
        conversation_id: i64,
        user_message: &str,
        ai_response: &str,
    ) -> Result<(), ClientError> {
        self.append(conversation_id, user_message, ai_response).await
    }

    async fn load_messages(&self, conversation_id: i64) -> Result<Vec<ChatMessage>, ClientError> {
        let messages = self.messages(conversation_id).await?;
        Ok(messages.into_iter().map(ChatMessage::from).collect())
    }
}
