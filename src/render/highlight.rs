use log::warn;
use syntect::{
    easy::HighlightLines,
    highlighting::{Theme, ThemeSet},
    parsing::SyntaxSet,
    util::{as_24_bit_terminal_escaped, LinesWithEndings},
};

use crate::core::ClientError;

const FALLBACK_THEME: &str = "base16-ocean.dark";
const RESET: &[u8] = b"\x1b[0m";

pub trait SyntaxHighlighting {
    /// Highlights one line of a fenced block. `language` has already been
    /// checked with [`SyntaxHighlighting::knows_language`].
    fn highlight_line(&self, line: &str, language: Option<&str>) -> Result<String, ClientError>;

    fn knows_language(&self, language: &str) -> bool;

    /// Escape sequence written when a code block closes.
    fn reset(&self) -> &[u8] {
        RESET
    }
}

pub struct SyntaxHighlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
}

impl SyntaxHighlighter {
    pub fn new(theme_name: Option<&str>) -> Self {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let mut themes = ThemeSet::load_defaults().themes;

        let requested = theme_name.and_then(|name| {
            let theme = themes.remove(name);
            if theme.is_none() {
                warn!("[Render] unknown theme {name}, using {FALLBACK_THEME}");
            }
            theme
        });
        let theme = requested
            .or_else(|| themes.remove(FALLBACK_THEME))
            .unwrap_or_default();

        Self { syntax_set, theme }
    }
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SyntaxHighlighting for SyntaxHighlighter {
    fn highlight_line(&self, line: &str, language: Option<&str>) -> Result<String, ClientError> {
        let syntax = language
            .and_then(|token| self.syntax_set.find_syntax_by_token(token))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let mut highlighter = HighlightLines::new(syntax, &self.theme);
        LinesWithEndings::from(line)
            .map(|part| {
                highlighter
                    .highlight_line(part, &self.syntax_set)
                    .map(|regions| as_24_bit_terminal_escaped(&regions, false))
                    .map_err(|e| ClientError::FormatError(format!("Syntax highlighting error: {e}")))
            })
            .collect()
    }

    fn knows_language(&self, language: &str) -> bool {
        !language.is_empty() && self.syntax_set.find_syntax_by_token(language).is_some()
    }
}
