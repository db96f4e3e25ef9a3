pub mod api;
pub mod cli;
pub mod core;
pub mod eventsource;
pub mod render;

pub use crate::core::{ChatSession, ClientError, Config};
pub use eventsource::{EventSourceExt, EventStream, StreamEvent};
