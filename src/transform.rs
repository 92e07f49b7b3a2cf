use crate::errors::Result;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::path::Path;

/// Extensions the heuristic rules understand.
pub const UI_EXTENSIONS: &[&str] = &["tsx", "jsx", "ts", "js", "mdx"];

/// Utility appended to large headings.
const BALANCE_TOKEN: &str = "text-balance";
/// Literals at least this long are worth wrapping in the helper.
const WRAP_MIN_LEN: usize = 60;

/// Returns `true` when `path` has one of the [`UI_EXTENSIONS`].
pub fn is_ui_source(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| UI_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Deterministic, low-risk rewrites for Tailwind-flavoured UI sources.
///
/// Rules run in a fixed order over the same text:
///
/// 1. `text-zinc-NNN`, `bg-zinc-NNN` and `border-zinc-NNN` become their
///    `neutral` spelling.
/// 2. `<h1>`..`<h6>` with a `text-2xl`..`text-5xl` class gain `text-balance`.
/// 3. If the file already calls `cn(...)`, long `className` literals are
///    wrapped in it.
/// 4. Trailing spaces and tabs are stripped from every line.
///
/// [`TransformEngine::transform`] is idempotent. Each rule leaves a match
/// untouched whenever it is unsure.
pub struct TransformEngine {
    zinc_tokens: Regex,
    heading: Regex,
    large_size: Regex,
    helper_call: Regex,
    class_literal: Regex,
}

impl TransformEngine {
    pub fn new() -> Result<Self> {
        Ok(Self {
            zinc_tokens: Regex::new(r"\b(text|bg|border)-zinc-([0-9]{3})\b")?,
            heading: Regex::new(
                r#"<h([1-6])([^>]*?)className=(?:"([^"'`]*)"|'([^"'`]*)'|`([^"'`]*)`)"#,
            )?,
            large_size: Regex::new(r"\btext-(2xl|3xl|4xl|5xl)\b")?,
            helper_call: Regex::new(r"\bcn\s*\(")?,
            class_literal: Regex::new(&format!(
                r#"\bclassName=(?:"([^"'`]{{{n},}})"|'([^"'`]{{{n},}})'|`([^"'`]{{{n},}})`)"#,
                n = WRAP_MIN_LEN
            ))?,
        })
    }

    /// Applies every rule in order.
    pub fn transform(&self, source: &str) -> String {
        let out = self.canonicalize_tokens(source);
        let out = self.balance_headings(&out);
        let out = self.wrap_long_literals(&out);
        strip_trailing_whitespace(&out)
    }

    fn canonicalize_tokens<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.zinc_tokens.replace_all(text, "${1}-neutral-${2}")
    }

    fn balance_headings<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.heading.replace_all(text, |caps: &Captures| {
            let whole = caps[0].to_string();
            // Only the tag's first className counts; a later one is reached
            // only when the first is not a plain literal.
            if caps[2].contains("className=") {
                return whole;
            }
            let Some((quote, cls)) = quoted_value(caps, 3) else {
                return whole;
            };
            if cls.contains(BALANCE_TOKEN) || !self.large_size.is_match(cls) {
                return whole;
            }
            format!(
                "<h{}{}className={quote}{cls} {BALANCE_TOKEN}{quote}",
                &caps[1], &caps[2]
            )
        })
    }

    fn wrap_long_literals<'a>(&self, text: &'a str) -> Cow<'a, str> {
        // Only files that already use the helper; we never add the import.
        if !self.helper_call.is_match(text) {
            return Cow::Borrowed(text);
        }
        self.class_literal.replace_all(text, |caps: &Captures| {
            let whole = caps[0].to_string();
            let Some((quote, cls)) = quoted_value(caps, 1) else {
                return whole;
            };
            if cls.contains('{') || cls.contains('}') || cls.contains('\n') {
                return whole;
            }
            format!("className={{cn({quote}{cls}{quote})}}")
        })
    }
}

/// Finds which of the three quote alternatives starting at group `first`
/// matched, returning the quote character and the captured value.
fn quoted_value<'c>(caps: &'c Captures, first: usize) -> Option<(char, &'c str)> {
    ['"', '\'', '`']
        .into_iter()
        .enumerate()
        .find_map(|(offset, quote)| caps.get(first + offset).map(|m| (quote, m.as_str())))
}

fn strip_trailing_whitespace(text: &str) -> String {
    text.split('\n')
        .map(|line| line.trim_end_matches([' ', '\t']))
        .collect::<Vec<_>>()
        .join("\n")
}
