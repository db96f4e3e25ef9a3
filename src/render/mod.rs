mod highlight;
mod markdown;
mod message;

pub use highlight::{SyntaxHighlighter, SyntaxHighlighting};
pub use markdown::MarkdownRenderer;
pub use message::{header, TranscriptPrinter};
