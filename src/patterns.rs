use crate::errors::Result;
use regex::Regex;

/// A glob pattern compiled into an anchored regex.
///
/// Supported syntax, read left to right:
///
/// - `**/` matches zero or more whole path segments, so `**/x` also matches a
///   root-level `x`.
/// - `**` not followed by `/` matches anything, separators included.
/// - `*` matches a run of characters within one segment.
/// - `?` matches exactly one character other than `/`.
/// - Everything else is literal.
///
/// Paths are expected to be root-relative with forward slashes.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    regex: Regex,
}

impl PathPattern {
    /// Compiles a glob. The same input always yields an equivalent matcher.
    pub fn compile(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&glob_to_regex(pattern))?;
        Ok(Self {
            raw: pattern.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, rel_path: &str) -> bool {
        self.regex.is_match(rel_path)
    }

    /// Returns `true` when every path below `rel_dir` is matched by this pattern.
    ///
    /// Only patterns ending in `/**` can answer yes: if such a pattern matches
    /// `dir/`, its trailing `.*` accepts any suffix.
    pub fn covers_dir(&self, rel_dir: &str) -> bool {
        self.raw.ends_with("/**") && self.regex.is_match(&format!("{rel_dir}/"))
    }
}

/// A union of compiled patterns; matches when any member matches.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<PathPattern>,
}

impl PatternSet {
    /// Compiles every non-empty pattern in `patterns`.
    pub fn compile<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .filter(|p| !p.as_ref().is_empty())
            .map(|p| PathPattern::compile(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn is_match(&self, rel_path: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(rel_path))
    }

    pub fn covers_dir(&self, rel_dir: &str) -> bool {
        self.patterns.iter().any(|p| p.covers_dir(rel_dir))
    }
}

/// Translates the supported glob subset into an anchored regex source string.
fn glob_to_regex(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut re = String::with_capacity(glob.len() * 2 + 2);
    re.push('^');

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    re.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    re.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                re.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                re.push_str("[^/]");
                i += 1;
            }
            c => {
                let mut buf = [0u8; 4];
                re.push_str(&regex::escape(c.encode_utf8(&mut buf)));
                i += 1;
            }
        }
    }

    re.push('$');
    re
}
