mod format;
mod markdown;
mod table;
mod syntax;

pub use format::normalize;
pub use markdown::MarkdownRenderer;
pub use syntax::SyntaxCache;
pub use table::Table;
