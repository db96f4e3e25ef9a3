use std::io::Write;

use super::highlight::SyntaxHighlighting;
use crate::core::ClientError;

const FENCE: &str = "```";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Block {
    Text,
    Code { language: Option<String> },
}

/// Writes markdown text as it streams in, highlighting fenced code blocks
/// line by line. Fence lines themselves are not printed.
///
/// Plain text is written through immediately, except at the start of a line
/// where it is held back until it can no longer be a fence.
pub struct MarkdownRenderer<H: SyntaxHighlighting> {
    highlighter: H,
    block: Block,
    line: String,
    at_line_start: bool,
}

impl<H: SyntaxHighlighting> MarkdownRenderer<H> {
    pub fn new(highlighter: H) -> Self {
        Self {
            highlighter,
            block: Block::Text,
            line: String::with_capacity(80),
            at_line_start: true,
        }
    }

    pub fn push<W: Write>(&mut self, writer: &mut W, chunk: &str) -> Result<(), ClientError> {
        chunk.chars().try_for_each(|c| match self.block {
            Block::Text => self.push_text(writer, c),
            Block::Code { .. } => self.push_code(writer, c),
        })
    }

    /// Flushes whatever is buffered and resets to the start of a document.
    pub fn finish<W: Write>(&mut self, writer: &mut W) -> Result<(), ClientError> {
        match std::mem::replace(&mut self.block, Block::Text) {
            Block::Text => writer.write_all(self.line.as_bytes())?,
            Block::Code { language } => {
                if !self.line.is_empty() {
                    self.write_code_line(writer, language.as_deref())?;
                }
                writer.write_all(self.highlighter.reset())?;
            }
        }
        self.line.clear();
        self.at_line_start = true;
        Ok(())
    }

    fn push_text<W: Write>(&mut self, writer: &mut W, c: char) -> Result<(), ClientError> {
        if !self.at_line_start {
            write!(writer, "{c}")?;
            self.at_line_start = c == '\n';
            return Ok(());
        }

        self.line.push(c);
        if c == '\n' {
            if let Some(info) = self.line.trim_start().strip_prefix(FENCE) {
                let language = info.trim();
                self.block = Block::Code {
                    language: self
                        .highlighter
                        .knows_language(language)
                        .then(|| language.to_string()),
                };
            } else {
                writer.write_all(self.line.as_bytes())?;
            }
            self.line.clear();
        } else if !could_be_fence(&self.line) {
            writer.write_all(self.line.as_bytes())?;
            self.line.clear();
            self.at_line_start = false;
        }
        Ok(())
    }

    fn push_code<W: Write>(&mut self, writer: &mut W, c: char) -> Result<(), ClientError> {
        self.line.push(c);
        if c != '\n' {
            return Ok(());
        }

        if self.line.trim() == FENCE {
            writer.write_all(self.highlighter.reset())?;
            self.block = Block::Text;
        } else {
            let language = match &self.block {
                Block::Code { language } => language.clone(),
                Block::Text => None,
            };
            self.write_code_line(writer, language.as_deref())?;
        }
        self.line.clear();
        Ok(())
    }

    fn write_code_line<W: Write>(
        &mut self,
        writer: &mut W,
        language: Option<&str>,
    ) -> Result<(), ClientError> {
        let highlighted = self.highlighter.highlight_line(&self.line, language)?;
        writer.write_all(highlighted.as_bytes())?;
        Ok(())
    }
}

/// Whether a partial line may still turn into an opening fence.
fn could_be_fence(partial: &str) -> bool {
    let trimmed = partial.trim_start();
    trimmed.starts_with(FENCE) || FENCE.starts_with(trimmed)
}

#[cfg(test)]
pub(crate) struct UppercaseHighlighter;

#[cfg(test)]
impl SyntaxHighlighting for UppercaseHighlighter {
    fn highlight_line(&self, line: &str, language: Option<&str>) -> Result<String, ClientError> {
        Ok(match language {
            Some(language) => format!("{language}:{}", line.to_uppercase()),
            None => line.to_uppercase(),
        })
    }

    fn knows_language(&self, language: &str) -> bool {
        matches!(language, "rust" | "python")
    }

    fn reset(&self) -> &[u8] {
        b"|"
    }
}
