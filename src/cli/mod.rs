mod args;
mod chat;
mod prompt;
mod run;

pub use args::{Args, Command, ConversationCommand, DocumentCommand};
pub use chat::exchange;
pub use run::run;
