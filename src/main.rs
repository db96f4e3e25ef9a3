use clap::Parser;
use colored::Colorize;
use rag_chat::cli::{run, Args};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    if let Err(e) = run(args).await {
        eprintln!("{} {e}", "Error:".red().bold());
        if e.is_authentication() {
            eprintln!("Log in again with `rag-chat login <username or email>`.");
        }
        std::process::exit(1);
    }
}
