mod auth;
mod chat;
mod conversations;
