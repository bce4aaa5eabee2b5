use std::sync::OnceLock;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};

const THEME: &str = "base16-ocean.dark";

static SYNTAX_CACHE: OnceLock<SyntaxCache> = OnceLock::new();

/// Syntect definitions are expensive to load, so they are loaded once per process.
pub struct SyntaxCache {
    pub syntax_set: SyntaxSet,
    theme_set: ThemeSet,
}

impl SyntaxCache {
    pub fn global() -> &'static SyntaxCache {
        SYNTAX_CACHE.get_or_init(|| Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
        })
    }

    /// Looks up a fence tag such as `rust`, `py` or `rust,ignore`.
    pub fn get_syntax(&self, fence: &str) -> &SyntaxReference {
        let language = fence_language(fence);
        self.syntax_set
            .find_syntax_by_token(language)
            .or_else(|| self.syntax_set.find_syntax_by_extension(language))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text())
    }

    pub fn get_theme(&self) -> &Theme {
        &self.theme_set.themes[THEME]
    }
}

fn fence_language(fence: &str) -> &str {
    fence
        .split(|c: char| c == ',' || c.is_whitespace())
        .next()
        .unwrap_or("")
        .trim()
}
