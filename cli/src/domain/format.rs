//! String helpers for log output and shell command construction.
//!
//! `obfuscate`, `escape` and `quote` back the interpolation filters
//! (`%{token|obfuscate}`). `opts_for` is for providers written in Rust that
//! build command lines from option lists.

/// Masking character used by [`obfuscate`].
const MASK: char = '*';

/// Width of an obfuscated secret.
const OBFUSCATED_WIDTH: usize = 20;

/// Hides a secret for display: keeps the last 4 characters, right-aligned in
/// a 20 character field padded with `*`.
///
/// Secrets shorter than 4 characters are fully masked.
#[must_use]
pub fn obfuscate(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    let tail: String = if chars.len() >= 4 {
        chars[chars.len() - 4..].iter().collect()
    } else {
        String::new()
    };
    let mut out: String = std::iter::repeat_n(MASK, OBFUSCATED_WIDTH - tail.chars().count()).collect();
    out.push_str(&tail);
    out
}

/// Wraps `s` in double quotes.
#[must_use]
pub fn quote(s: &str) -> String {
    format!("\"{s}\"")
}

/// Escapes `s` for use as a single word in a POSIX shell command.
#[must_use]
pub fn escape(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    let mut out = String::with_capacity(s.len() * 2);
    for c in s.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '_' | '-' | '.' | ',' | ':' | '+' | '/' | '@' => {
                out.push(c);
            }
            '\n' => out.push_str("'\n'"),
            _ => {
                out.push('\\');
                out.push(c);
            }
        }
    }
    out
}

// ── Option strings ───────────────────────────────────────────────────────────

/// Value of a command-line option passed to an external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptValue {
    /// Bare flag, e.g. `--force`.
    Flag,
    /// `--key="value"`.
    Str(String),
    /// `--key="a" --key="b"`.
    List(Vec<String>),
}

/// How option keys are rendered.
#[derive(Debug, Clone, Copy)]
pub struct OptStyle<'a> {
    /// Option prefix, `--` by default.
    pub prefix: &'a str,
    /// Render `skip_cleanup` as `skip-cleanup`.
    pub dashed: bool,
}

impl Default for OptStyle<'_> {
    fn default() -> Self {
        Self {
            prefix: "--",
            dashed: false,
        }
    }
}

/// Renders set options as a single argument string, skipping unset ones.
///
/// Returns `None` when no option is set.
#[must_use]
pub fn opts_for(opts: &[(&str, Option<OptValue>)], style: OptStyle<'_>) -> Option<String> {
    let parts: Vec<String> = opts
        .iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| opt_for(key, v, style)))
        .collect();
    (!parts.is_empty()).then(|| parts.join(" "))
}

fn opt_for(key: &str, value: &OptValue, style: OptStyle<'_>) -> String {
    let key = opt_key(key, style);
    match value {
        OptValue::Flag => key,
        OptValue::Str(v) => format!("{key}={v:?}"),
        OptValue::List(values) => values
            .iter()
            .map(|v| format!("{key}={v:?}"))
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn opt_key(key: &str, style: OptStyle<'_>) -> String {
    let key = if style.dashed {
        key.replace('_', "-")
    } else {
        key.to_string()
    };
    format!("{}{key}", style.prefix)
}

// ── Unit tests ───────────────────────────────────────────────────────────────
