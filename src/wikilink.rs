use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static WIKILINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[([^\]]+)\]\]").unwrap());

/// A `[[target]]` or `[[target|alias]]` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wikilink {
    pub target: String,
    pub alias: Option<String>,
    /// Byte range of the whole token, brackets included.
    pub range: Range<usize>,
}

pub fn parse_wikilinks(content: &str) -> Vec<Wikilink> {
    WIKILINK_RE
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let inner = caps.get(1)?.as_str();
            let mut parts = inner.split('|');
            let target = parts.next().unwrap_or_default().trim().to_string();
            let alias = parts
                .next()
                .map(str::trim)
                .filter(|alias| !alias.is_empty())
                .map(str::to_string);
            Some(Wikilink {
                target,
                alias,
                range: whole.range(),
            })
        })
        .collect()
}

/// The link whose token covers `offset`. Both ends count, so a cursor right
/// after the closing brackets still hits the link.
pub fn wikilink_at(content: &str, offset: usize) -> Option<Wikilink> {
    parse_wikilinks(content)
        .into_iter()
        .find(|link| offset >= link.range.start && offset <= link.range.end)
}

// ---- Tests ----
