//! ReDoS-guarded regex compilation
//!
//! User-supplied matcher patterns run on a backtracking engine (they need
//! lookaround, e.g. `/((?!api|_next).*)`), so every pattern is screened for
//! the nested-quantifier shape before it is compiled. A rejected pattern is
//! never executed; callers treat it as a non-match.

use fancy_regex::{Regex, RegexBuilder};
use tracing::warn;

/// Upper bound on backtracking steps for any single match attempt.
const BACKTRACK_LIMIT: usize = 1_000_000;

/// Why a pattern was not compiled
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegexRejection {
    #[error("quantified group at byte {position} already contains a quantifier")]
    NestedQuantifier { position: usize },
    #[error("unsupported regex flag `{0}`")]
    UnsupportedFlag(char),
    #[error("invalid regex: {0}")]
    Invalid(String),
}

/// Screens a pattern for the nested-quantifier ReDoS shape
///
/// A group that already contains a quantified sub-expression and is itself
/// followed by `+`, `*` or `{m,n}` is rejected: `(a+)+`, `(?:\d*)*`,
/// `((a+)b){2,}`. Escapes and character classes are skipped structurally so
/// `[+*]+` and `\(a+\)+` are not misread.
///
/// # Examples
///
/// ```
/// use vinext_router::safe_regex::check_regex_safety;
///
/// assert!(check_regex_safety("/((?!api|_next).*)").is_ok());
/// assert!(check_regex_safety("(a+)+").is_err());
/// ```
pub fn check_regex_safety(pattern: &str) -> Result<(), RegexRejection> {
    let chars: Vec<(usize, char)> = pattern.char_indices().collect();
    // quantified[d] records whether depth d has seen a quantifier fire.
    let mut quantified = vec![false];
    let mut i = 0;

    while i < chars.len() {
        let (position, ch) = chars[i];
        match ch {
            '\\' => {
                i += 2;
                continue;
            }
            '[' => {
                i = skip_class(&chars, i);
                continue;
            }
            '(' => quantified.push(false),
            ')' => {
                let inner = if quantified.len() > 1 {
                    quantified.pop().unwrap_or(false)
                } else {
                    false
                };
                let followed_by_quantifier = is_quantifier_at(&chars, i + 1);
                if inner && followed_by_quantifier {
                    return Err(RegexRejection::NestedQuantifier { position });
                }
                if let Some(outer) = quantified.last_mut() {
                    *outer |= inner || followed_by_quantifier;
                }
            }
            '+' | '*' => mark(&mut quantified),
            '{' if is_quantifier_at(&chars, i) => mark(&mut quantified),
            _ => {}
        }
        i += 1;
    }

    Ok(())
}

/// Returns true if the pattern passes [`check_regex_safety`]
pub fn is_safe_regex(pattern: &str) -> bool {
    check_regex_safety(pattern).is_ok()
}

/// Compiles a pattern after the safety screen
///
/// `flags` follows the JavaScript flag alphabet: `i`, `m` and `s` map to
/// inline flags, `g`, `u`, `d` and `y` have no meaning for a single anchored
/// test and are ignored.
pub fn compile_safe_regex(pattern: &str, flags: &str) -> Result<Regex, RegexRejection> {
    check_regex_safety(pattern)?;

    let mut inline = String::new();
    for flag in flags.chars() {
        match flag {
            'i' | 'm' | 's' => inline.push(flag),
            'g' | 'u' | 'd' | 'y' => {}
            other => return Err(RegexRejection::UnsupportedFlag(other)),
        }
    }

    let source = if inline.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{inline}){pattern}")
    };

    RegexBuilder::new(&source)
        .backtrack_limit(BACKTRACK_LIMIT)
        .build()
        .map_err(|e| RegexRejection::Invalid(e.to_string()))
}

/// Compiles a pattern, or returns `None` with a warning-level diagnostic
///
/// # Examples
///
/// ```
/// use vinext_router::safe_regex::safe_regex;
///
/// let re = safe_regex("^/posts/\\d+$", "").unwrap();
/// assert!(re.is_match("/posts/42").unwrap());
///
/// assert!(safe_regex("^(a+)+$", "").is_none());
/// assert!(safe_regex("^([a-z]$", "").is_none());
/// ```
pub fn safe_regex(pattern: &str, flags: &str) -> Option<Regex> {
    match compile_safe_regex(pattern, flags) {
        Ok(regex) => Some(regex),
        Err(reason) => {
            warn!(pattern, %reason, "regex pattern rejected; treating as non-matching");
            None
        }
    }
}

fn mark(quantified: &mut [bool]) {
    if let Some(current) = quantified.last_mut() {
        *current = true;
    }
}

/// Index just past the `]` closing the class that opens at `start`.
fn skip_class(chars: &[(usize, char)], start: usize) -> usize {
    let mut j = start + 1;
    while j < chars.len() {
        match chars[j].1 {
            '\\' => j += 2,
            ']' => return j + 1,
            _ => j += 1,
        }
    }
    chars.len()
}

/// `+`, `*`, or a well-formed `{m}` / `{m,}` / `{m,n}` at index `i`.
fn is_quantifier_at(chars: &[(usize, char)], i: usize) -> bool {
    match chars.get(i).map(|(_, c)| *c) {
        Some('+') | Some('*') => true,
        Some('{') => {
            let mut j = i + 1;
            let digits_start = j;
            while chars.get(j).is_some_and(|(_, c)| c.is_ascii_digit()) {
                j += 1;
            }
            if j == digits_start {
                return false;
            }
            if chars.get(j).map(|(_, c)| *c) == Some(',') {
                j += 1;
                while chars.get(j).is_some_and(|(_, c)| c.is_ascii_digit()) {
                    j += 1;
                }
            }
            chars.get(j).map(|(_, c)| *c) == Some('}')
        }
        _ => false,
    }
}
