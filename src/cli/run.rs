use colored::Colorize;
use log::{debug, warn};
use std::io::{self, Write};

use super::args::{Args, Command, ConversationCommand, DocumentCommand};
use super::{chat, prompt};
use crate::{
    api::{
        ApiClient, AssistantClient, AuthClient, AuthenticatedSession, ConversationClient,
        LoginOutcome, Registration, UploadPolicy,
    },
    core::{
        session::{SessionState, SessionStore},
        transcript::ChatMessage,
        ClientError, Config,
    },
};

/// Client for the auth service, authenticated when a token is stored.
fn auth_client(config: &Config, session: &SessionState) -> AuthClient {
    let api = ApiClient::new(config.auth_url.as_str());
    AuthClient::new(match session.token.as_deref() {
        Some(token) if session.is_authenticated() => api.with_token(token),
        _ => api,
    })
}

fn conversation_client(config: &Config, session: &SessionState) -> Result<ConversationClient, ClientError> {
    let api = ApiClient::new(config.auth_url.as_str()).with_token(session.require_token()?);
    Ok(ConversationClient::new(api))
}

fn assistant_client(config: &Config, session: &SessionState) -> Result<AssistantClient, ClientError> {
    let api = ApiClient::new(config.assistant_url.as_str()).with_token(session.require_token()?);
    Ok(AssistantClient::new(api, UploadPolicy::from(config)))
}

fn sign_in<W: Write>(
    store: &SessionStore,
    session: &mut SessionState,
    signed_in: AuthenticatedSession,
    out: &mut W,
) -> Result<(), ClientError> {
    let username = signed_in.user.username.clone();
    session.authenticate(signed_in.token, signed_in.user, signed_in.session_id);
    store.persist(session)?;
    writeln!(out, "{} {}", "Logged in as".green(), username.bold())?;
    Ok(())
}

pub async fn run(args: Args) -> Result<(), ClientError> {
    let _ = dotenv::dotenv();

    let mut config = Config::load()?;
    if let Some(url) = args.auth_url {
        config.update_auth_url(url);
    }
    if let Some(url) = args.assistant_url {
        config.update_assistant_url(url);
    }

    let store = SessionStore::new(config.session_path()?);
    let mut session = store.load()?;
    debug!(
        "[SETTINGS] auth_url: {}, assistant_url: {}, session: {}, logged in: {}",
        config.auth_url,
        config.assistant_url,
        store.path().display(),
        session.is_authenticated()
    );

    let mut stdout = io::stdout();
    execute(args.command, &config, &store, &mut session, &mut stdout).await
}

async fn execute<W: Write>(
    command: Command,
    config: &Config,
    store: &SessionStore,
    session: &mut SessionState,
    out: &mut W,
) -> Result<(), ClientError> {
    match command {
        Command::Register {
            email,
            username,
            password,
        } => {
            let (password, confirm_password) = prompt::password_with_confirmation(password)?;
            let message = auth_client(config, session)
                .register(&Registration {
                    email: &email,
                    username: &username,
                    password: &password,
                    confirm_password: &confirm_password,
                })
                .await?;
            writeln!(out, "{}", message.green())?;
        }
        Command::Login {
            identifier,
            password,
        } => {
            let password = match password {
                Some(password) => password,
                None => prompt::prompt_secret("Password")?,
            };
            match auth_client(config, session)
                .login(&identifier, &password)
                .await?
            {
                LoginOutcome::Authenticated(signed_in) => sign_in(store, session, signed_in, out)?,
                LoginOutcome::VerificationRequired {
                    verification,
                    masked_email,
                } => {
                    session.pending_verification = Some(verification);
                    store.persist(session)?;
                    writeln!(
                        out,
                        "{}\nA verification code was sent to {}. Run `rag-chat verify <code>`.",
                        "This device is not recognised yet.".yellow(),
                        masked_email.bold()
                    )?;
                }
            }
        }
        Command::Verify { code } => {
            let pending = session.require_pending()?.clone();
            let signed_in = auth_client(config, session)
                .verify_device(&pending, &code)
                .await?;
            sign_in(store, session, signed_in, out)?;
        }
        Command::ResendCode => {
            let pending = session.require_pending()?.clone();
            let message = auth_client(config, session).resend_code(&pending).await?;
            writeln!(out, "{message}")?;
        }
        Command::ResetInit { email } => {
            let initiation = auth_client(config, session).initiate_reset(&email).await?;
            if let Some(token) = initiation.token {
                session.reset_token = Some(token);
                store.persist(session)?;
            }
            writeln!(out, "{}", initiation.message)?;
        }
        Command::Reset { token, password } => {
            let token = token
                .or_else(|| session.reset_token.clone())
                .unwrap_or_default();
            let (password, confirm_password) = prompt::password_with_confirmation(password)?;
            let message = auth_client(config, session)
                .reset_password(&token, &password, &confirm_password)
                .await?;
            if session.reset_token.take().is_some() {
                store.persist(session)?;
            }
            writeln!(out, "{}", message.green())?;
        }
        Command::Logout => {
            if session.is_authenticated() {
                if let Err(e) = auth_client(config, session)
                    .logout(session.session_id)
                    .await
                {
                    warn!("[Auth] logout request failed: {e}");
                }
            }
            *session = SessionState::default();
            store.clear()?;
            writeln!(out, "Logged out.")?;
        }
        Command::Profile => {
            session.require_token()?;
            let user = auth_client(config, session).profile().await?;
            writeln!(out, "{} {}", "Username:".bold(), user.username)?;
            writeln!(out, "{} {}", "Email:".bold(), user.email)?;
            if let Some(role) = user.role {
                writeln!(out, "{} {role}", "Role:".bold())?;
            }
        }
        Command::Sessions => {
            session.require_token()?;
            let sessions = auth_client(config, session).sessions().await?;
            for device in sessions {
                let current = if session.session_id == Some(device.id) {
                    " (current)".green().to_string()
                } else {
                    String::new()
                };
                writeln!(
                    out,
                    "{:>5}  {}  {}  last used {}{current}",
                    device.id,
                    device.device_name.as_deref().unwrap_or("unknown device"),
                    device.ip_address.as_deref().unwrap_or("-"),
                    device.last_accessed_at.as_deref().unwrap_or("-"),
                )?;
            }
        }
        Command::Ask {
            question,
            conversation,
        } => {
            let token = session.require_token()?;
            chat::ask(config, token, &question.join(" "), conversation).await?;
        }
        Command::Chat { conversation } => {
            let token = session.require_token()?;
            chat::interactive(config, token, conversation).await?;
        }
        Command::Conversations { action } => {
            let client = conversation_client(config, session)?;
            conversations(&client, config, action.unwrap_or(ConversationCommand::List), out)
                .await?;
        }
        Command::Documents { action } => {
            let client = assistant_client(config, session)?;
            documents(&client, action.unwrap_or(DocumentCommand::List), out).await?;
        }
    }
    Ok(())
}

async fn conversations<W: Write>(
    client: &ConversationClient,
    config: &Config,
    action: ConversationCommand,
    out: &mut W,
) -> Result<(), ClientError> {
    match action {
        ConversationCommand::List => {
            let conversations = client.list().await?;
            if conversations.is_empty() {
                writeln!(out, "No conversations yet.")?;
            }
            for conversation in conversations {
                let pin = if conversation.is_pinned { "*".yellow() } else { " ".normal() };
                writeln!(
                    out,
                    "{pin}{:>5}  {}  {}",
                    conversation.id,
                    conversation.title.bold(),
                    conversation.created_at.as_deref().unwrap_or_default().dimmed()
                )?;
            }
        }
        ConversationCommand::Show { id } => {
            let messages = client.messages(id).await?;
            let mut printer = chat::printer(config);
            for message in messages {
                printer.print_message(out, &ChatMessage::from(message))?;
            }
        }
        ConversationCommand::Rename { id, title } => {
            let conversation = client.rename(id, &title.join(" ")).await?;
            writeln!(out, "Renamed to {}", conversation.title.bold())?;
        }
        ConversationCommand::Pin { id } => {
            let conversation = client.toggle_pin(id).await?;
            let state = if conversation.is_pinned { "Pinned" } else { "Unpinned" };
            writeln!(out, "{state} {}", conversation.title.bold())?;
        }
        ConversationCommand::Delete { id } => {
            let message = client.delete(id).await?;
            writeln!(out, "{message}")?;
        }
    }
    Ok(())
}

async fn documents<W: Write>(
    client: &AssistantClient,
    action: DocumentCommand,
    out: &mut W,
) -> Result<(), ClientError> {
    match action {
        DocumentCommand::List => {
            let documents = client.documents().await?;
            if documents.is_empty() {
                writeln!(out, "No documents uploaded.")?;
            }
            for document in documents {
                writeln!(out, "{:>5}  {}", document.id, document.filename)?;
            }
        }
        DocumentCommand::Upload { paths } => {
            let result = client.upload(&paths).await?;
            for document in result.files {
                writeln!(out, "{} {} ({})", "Uploaded".green(), document.filename, document.id)?;
            }
        }
        DocumentCommand::Delete { id } => {
            let message = client.delete_document(id).await?;
            writeln!(out, "{message}")?;
        }
    }
    Ok(())
}
