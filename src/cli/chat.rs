use colored::Colorize;
use log::debug;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::api::{ApiClient, AssistantClient, ConversationClient, UploadPolicy};
use crate::core::{ChatSession, ChatSettings, ClientError, Config, StreamOutcome, TranscriptUpdate};
use crate::render::{header, SyntaxHighlighter, SyntaxHighlighting, TranscriptPrinter};

/// A line typed into the interactive chat.
#[derive(Debug, PartialEq, Eq)]
enum ReplInput<'a> {
    Empty,
    Quit,
    New,
    Open(i64),
    Invalid(&'static str),
    Message(&'a str),
}

fn parse_input(line: &str) -> ReplInput<'_> {
    let line = line.trim();
    if line.is_empty() {
        return ReplInput::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ReplInput::Message(line);
    };

    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("quit" | "exit" | "q"), None) => ReplInput::Quit,
        (Some("new"), None) => ReplInput::New,
        (Some("open"), Some(id)) => id
            .parse()
            .map_or(ReplInput::Invalid("Usage: /open <conversation id>"), ReplInput::Open),
        (Some("open"), None) => ReplInput::Invalid("Usage: /open <conversation id>"),
        _ => ReplInput::Invalid("Commands: /new, /open <id>, /quit"),
    }
}

/// Chat session backed by the real services.
pub fn chat_session(config: &Config, token: &str) -> ChatSession {
    let assistant = AssistantClient::new(
        ApiClient::new(config.assistant_url.as_str()).with_token(token),
        UploadPolicy::from(config),
    );
    let conversations =
        ConversationClient::new(ApiClient::new(config.auth_url.as_str()).with_token(token));
    ChatSession::new(
        Box::new(assistant),
        Box::new(conversations),
        ChatSettings::from(config),
    )
}

pub fn printer(config: &Config) -> TranscriptPrinter<SyntaxHighlighter> {
    TranscriptPrinter::new(
        SyntaxHighlighter::new(config.theme.as_deref()),
        config.info_mode_marker.as_str(),
    )
}

/// Cancels `cancel` on the next Ctrl-C until the returned handle is aborted.
fn cancel_on_ctrl_c(cancel: &CancellationToken) -> tokio::task::JoinHandle<()> {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    })
}

/// Sends one question and prints the answer while it streams.
pub async fn exchange<H, W>(
    chat: &mut ChatSession,
    printer: &mut TranscriptPrinter<H>,
    question: &str,
    cancel: &CancellationToken,
    writer: &mut W,
) -> Result<StreamOutcome, ClientError>
where
    H: SyntaxHighlighting,
    W: Write,
{
    let mut header_printed = false;
    let mut render_error = None;

    let outcome = chat
        .send(question, cancel, |update| {
            let rendered = match update {
                TranscriptUpdate::Progress(message) => {
                    let printed_header = if header_printed {
                        Ok(())
                    } else {
                        header_printed = true;
                        writeln!(writer, "{}", header(message, printer.info_marker()))
                            .map_err(ClientError::from)
                    };
                    printed_header.and_then(|()| printer.update(writer, &message.content))
                }
                TranscriptUpdate::Failed(message) => printer
                    .end_stream(writer)
                    .and_then(|()| printer.print_message(writer, message)),
            };
            if let Err(e) = rendered {
                render_error.get_or_insert(e);
            }
        })
        .await?;

    printer.end_stream(writer)?;
    if let Some(e) = render_error {
        return Err(e);
    }
    if matches!(outcome, StreamOutcome::Cancelled) {
        writeln!(writer, "{}", "(cancelled)".dimmed())?;
    }
    Ok(outcome)
}

/// One-shot question. A failed exchange is returned as an error after the
/// error message has been printed.
pub async fn ask(
    config: &Config,
    token: &str,
    question: &str,
    conversation: Option<i64>,
) -> Result<(), ClientError> {
    let mut chat = chat_session(config, token);
    let mut printer = printer(config);
    let mut stdout = io::stdout();

    if let Some(id) = conversation {
        chat.open(id).await?;
    }

    let cancel = CancellationToken::new();
    let watcher = cancel_on_ctrl_c(&cancel);
    let outcome = exchange(&mut chat, &mut printer, question, &cancel, &mut stdout).await;
    watcher.abort();

    match outcome? {
        StreamOutcome::Failed(e) => Err(e),
        StreamOutcome::Completed { .. } | StreamOutcome::Cancelled => Ok(()),
    }
}

/// Interactive loop reading questions from stdin. Ctrl-C cancels the answer
/// being streamed, or leaves the loop while waiting for input.
pub async fn interactive(
    config: &Config,
    token: &str,
    conversation: Option<i64>,
) -> Result<(), ClientError> {
    let mut chat = chat_session(config, token);
    let mut printer = printer(config);
    let mut stdout = io::stdout();

    if let Some(id) = conversation {
        open(&mut chat, &mut printer, id, &mut stdout).await?;
    }
    writeln!(
        stdout,
        "{}",
        "Type a message, /new, /open <id> or /quit.".dimmed()
    )?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        write!(stdout, "{} ", ">".bold())?;
        stdout.flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            writeln!(stdout)?;
            break;
        };

        match parse_input(&line) {
            ReplInput::Empty => {}
            ReplInput::Quit => break,
            ReplInput::New => {
                chat.start_new();
                writeln!(stdout, "{}", "Started a new conversation.".dimmed())?;
            }
            ReplInput::Open(id) => {
                if let Err(e) = open(&mut chat, &mut printer, id, &mut stdout).await {
                    eprintln!("{}", e.to_string().red());
                }
            }
            ReplInput::Invalid(usage) => eprintln!("{}", usage.yellow()),
            ReplInput::Message(question) => {
                let cancel = CancellationToken::new();
                let watcher = cancel_on_ctrl_c(&cancel);
                let outcome =
                    exchange(&mut chat, &mut printer, question, &cancel, &mut stdout).await;
                watcher.abort();

                match outcome {
                    Ok(StreamOutcome::Failed(e)) => debug!("[Chat] exchange failed: {e}"),
                    Ok(_) => {}
                    Err(e) => eprintln!("{}", e.to_string().red()),
                }
            }
        }
    }
    Ok(())
}

/// Opens a stored conversation and prints its messages, or the single error
/// message left in the transcript.
async fn open<H: SyntaxHighlighting, W: Write>(
    chat: &mut ChatSession,
    printer: &mut TranscriptPrinter<H>,
    id: i64,
    writer: &mut W,
) -> Result<(), ClientError> {
    let opened = chat.open(id).await;
    for message in chat.transcript().messages() {
        printer.print_message(writer, message)?;
    }
    opened
}
