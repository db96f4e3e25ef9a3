pub mod assistant;
pub mod auth;
pub mod conversations;
pub mod http;

pub use assistant::{AssistantClient, Document, UploadPolicy, UploadResult};
pub use auth::{AuthClient, AuthenticatedSession, DeviceSession, LoginOutcome, Registration};
pub use conversations::{Conversation, ConversationClient, StoredMessage};
pub use http::ApiClient;
