use colored::Colorize;
use std::io::Write;

use super::highlight::SyntaxHighlighting;
use super::markdown::MarkdownRenderer;
use crate::core::transcript::{ChatMessage, Role};
use crate::core::ClientError;

/// Header line of a message: the author and, for assistant messages outside
/// the informational mode, a mode badge.
pub fn header(message: &ChatMessage, info_marker: &str) -> String {
    match message.role {
        Role::User => "You".green().bold().to_string(),
        Role::Assistant => {
            let label = "Assistant".blue().bold().to_string();
            match message.mode.as_deref() {
                Some(mode) if message.shows_actions(info_marker) => {
                    format!("{label} {}", format!("[{mode}]").dimmed())
                }
                _ => label,
            }
        }
    }
}

/// Prints messages and the in-progress answer of a chat.
pub struct TranscriptPrinter<H: SyntaxHighlighting> {
    renderer: MarkdownRenderer<H>,
    info_marker: String,
    printed: String,
}

impl<H: SyntaxHighlighting> TranscriptPrinter<H> {
    pub fn new(highlighter: H, info_marker: impl Into<String>) -> Self {
        Self {
            renderer: MarkdownRenderer::new(highlighter),
            info_marker: info_marker.into(),
            printed: String::new(),
        }
    }

    /// Prints a complete message with its header.
    pub fn print_message<W: Write>(
        &mut self,
        writer: &mut W,
        message: &ChatMessage,
    ) -> Result<(), ClientError> {
        writeln!(writer, "{}", header(message, &self.info_marker))?;
        self.renderer.push(writer, &message.content)?;
        self.renderer.finish(writer)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Writes the part of the streamed content not printed yet. If the
    /// content was replaced rather than extended, the whole message is
    /// printed again below a marker.
    pub fn update<W: Write>(&mut self, writer: &mut W, content: &str) -> Result<(), ClientError> {
        if let Some(suffix) = content.strip_prefix(self.printed.as_str()) {
            self.renderer.push(writer, suffix)?;
        } else {
            self.renderer.finish(writer)?;
            writeln!(writer, "\n{}", "(revised)".dimmed())?;
            self.renderer.push(writer, content)?;
        }
        self.printed.clear();
        self.printed.push_str(content);
        writer.flush()?;
        Ok(())
    }

    /// Ends the streamed message and gets ready for the next one.
    pub fn end_stream<W: Write>(&mut self, writer: &mut W) -> Result<(), ClientError> {
        self.renderer.finish(writer)?;
        if !self.printed.is_empty() {
            writeln!(writer)?;
        }
        self.printed.clear();
        writer.flush()?;
        Ok(())
    }

    pub fn info_marker(&self) -> &str {
        &self.info_marker
    }
}
