pub mod chat;
mod config;
pub mod error;
pub mod session;
pub mod transcript;
pub mod validation;

pub use chat::{ChatSession, ChatSettings, StreamOutcome, TranscriptUpdate};
pub use config::Config;
pub use error::ClientError;
