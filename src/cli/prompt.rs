use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{self, BufRead, IsTerminal, Write};

use crate::core::ClientError;

/// Reads one line from stdin after printing `label`.
pub fn prompt(label: &str) -> Result<String, ClientError> {
    print_label(label)?;
    read_answer(&mut io::stdin().lock())
}

/// Like [`prompt`], but typed characters are not echoed when stdin is a
/// terminal.
pub fn prompt_secret(label: &str) -> Result<String, ClientError> {
    if !io::stdin().is_terminal() {
        return prompt(label);
    }
    print_label(label)?;

    terminal::enable_raw_mode()?;
    let secret = read_hidden();
    terminal::disable_raw_mode()?;
    println!();
    secret
}

/// Uses `given` when present, otherwise asks for the value and its
/// confirmation.
pub fn password_with_confirmation(given: Option<String>) -> Result<(String, String), ClientError> {
    match given {
        Some(password) => Ok((password.clone(), password)),
        None => Ok((prompt_secret("Password")?, prompt_secret("Confirm password")?)),
    }
}

fn print_label(label: &str) -> Result<(), ClientError> {
    let mut stdout = io::stdout();
    write!(stdout, "{label}: ")?;
    stdout.flush()?;
    Ok(())
}

fn read_answer<R: BufRead>(reader: &mut R) -> Result<String, ClientError> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(ClientError::Validation("No input given".to_string()));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[derive(Debug, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Submit,
    Abort,
}

fn apply_key(secret: &mut String, key: KeyEvent) -> KeyOutcome {
    if key.kind != KeyEventKind::Press {
        return KeyOutcome::Continue;
    }
    match key.code {
        KeyCode::Enter => KeyOutcome::Submit,
        KeyCode::Esc => KeyOutcome::Abort,
        KeyCode::Char('c' | 'd') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            KeyOutcome::Abort
        }
        KeyCode::Backspace => {
            secret.pop();
            KeyOutcome::Continue
        }
        KeyCode::Char(c) => {
            secret.push(c);
            KeyOutcome::Continue
        }
        _ => KeyOutcome::Continue,
    }
}

/// Collects key presses until Enter. Must run in raw mode.
fn read_hidden() -> Result<String, ClientError> {
    let mut secret = String::new();
    loop {
        if let Event::Key(key) = event::read()? {
            match apply_key(&mut secret, key) {
                KeyOutcome::Continue => {}
                KeyOutcome::Submit => return Ok(secret),
                KeyOutcome::Abort => {
                    return Err(ClientError::Validation("Input cancelled".to_string()))
                }
            }
        }
    }
}
