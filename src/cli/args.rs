use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Base URL of the auth service
    #[arg(long, global = true)]
    pub auth_url: Option<String>,

    /// Base URL of the assistant service
    #[arg(long, global = true)]
    pub assistant_url: Option<String>,

    /// Enable debug output
    #[arg(short, long, global = true, default_value = "false")]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Log in with a username or email
    Login {
        identifier: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Finish a login from a new device with the emailed code
    Verify { code: String },
    /// Send a new device verification code
    ResendCode,
    /// Request a password reset email
    ResetInit { email: String },
    /// Set a new password
    Reset {
        /// Defaults to the token received from `reset-init`
        #[arg(long)]
        token: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    Logout,
    /// Show the logged-in account
    Profile,
    /// List active device sessions
    Sessions,
    /// Ask a single question and stream the answer
    Ask {
        #[arg(required = true)]
        question: Vec<String>,
        /// Continue a stored conversation
        #[arg(short, long)]
        conversation: Option<i64>,
    },
    /// Interactive chat
    Chat {
        /// Open a stored conversation first
        #[arg(short, long)]
        conversation: Option<i64>,
    },
    /// Manage stored conversations
    #[command(alias = "conv")]
    Conversations {
        #[command(subcommand)]
        action: Option<ConversationCommand>,
    },
    /// Manage documents of the knowledge base
    #[command(alias = "docs")]
    Documents {
        #[command(subcommand)]
        action: Option<DocumentCommand>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConversationCommand {
    List,
    /// Print the messages of a conversation
    Show { id: i64 },
    Rename {
        id: i64,
        #[arg(required = true)]
        title: Vec<String>,
    },
    /// Pin or unpin
    Pin { id: i64 },
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum DocumentCommand {
    List,
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    Delete { id: i64 },
}
