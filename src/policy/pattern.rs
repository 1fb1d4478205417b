//! Glob and regexp policies. Both ignore the current tag and test only the new one.

use regex::Regex;

use super::types::PolicyError;

pub const GLOB_PREFIX: &str = "glob:";
pub const REGEXP_PREFIX: &str = "regexp:";

/// Matches new tags against a shell-style wildcard pattern.
#[derive(Debug, Clone)]
pub struct GlobPolicy {
    policy: String,
    pattern: String,
    matcher: Regex,
}

impl GlobPolicy {
    /// Build from the full policy string, e.g. `glob:1.2.*`.
    ///
    /// # Errors
    /// Returns `PolicyError::Pattern` for an empty pattern, an extra `:`
    /// separator, or an unterminated `[` class.
    pub fn new(policy: &str) -> Result<Self, PolicyError> {
        let invalid = |reason: &str| PolicyError::Pattern {
            kind: "glob",
            policy: policy.to_string(),
            reason: reason.to_string(),
        };

        let pattern = policy
            .strip_prefix(GLOB_PREFIX)
            .ok_or_else(|| invalid("missing 'glob:' prefix"))?;
        if pattern.is_empty() {
            return Err(invalid("empty pattern"));
        }
        if pattern.contains(':') {
            return Err(invalid("unexpected ':' separator"));
        }

        let source = glob_to_regex(pattern).map_err(|reason| invalid(reason.as_str()))?;
        let matcher = Regex::new(&source).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            policy: policy.to_string(),
            pattern: pattern.to_string(),
            matcher,
        })
    }

    pub fn name(&self) -> &str {
        &self.policy
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn should_update(&self, _current: &str, new: &str) -> bool {
        self.matcher.is_match(new)
    }
}

/// Matches new tags against a regular expression (unanchored search).
#[derive(Debug, Clone)]
pub struct RegexpPolicy {
    policy: String,
    matcher: Regex,
}

impl RegexpPolicy {
    /// Build from the full policy string, e.g. `regexp:^v\d+$`.
    ///
    /// Everything after the first `regexp:` belongs to the expression.
    pub fn new(policy: &str) -> Result<Self, PolicyError> {
        let invalid = |reason: String| PolicyError::Pattern {
            kind: "regexp",
            policy: policy.to_string(),
            reason,
        };

        let pattern = policy
            .strip_prefix(REGEXP_PREFIX)
            .ok_or_else(|| invalid("missing 'regexp:' prefix".to_string()))?;
        if pattern.is_empty() {
            return Err(invalid("empty pattern".to_string()));
        }

        let matcher = Regex::new(pattern).map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            policy: policy.to_string(),
            matcher,
        })
    }

    pub fn name(&self) -> &str {
        &self.policy
    }

    pub fn pattern(&self) -> &str {
        self.matcher.as_str()
    }

    pub fn should_update(&self, _current: &str, new: &str) -> bool {
        self.matcher.is_match(new)
    }
}

/// Translate a glob into an anchored regex source.
fn glob_to_regex(glob: &str) -> Result<String, String> {
    let mut out = String::with_capacity(glob.len() * 2 + 2);
    out.push('^');

    let mut chars = glob.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                let mut class = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == ']' && !class.is_empty() {
                        closed = true;
                        break;
                    }
                    class.push(inner);
                }
                if !closed {
                    return Err("unterminated character class".to_string());
                }
                out.push('[');
                if let Some(rest) = class.strip_prefix('!') {
                    out.push('^');
                    push_class_body(&mut out, rest);
                } else {
                    push_class_body(&mut out, &class);
                }
                out.push(']');
            }
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }

    out.push('$');
    Ok(out)
}

fn push_class_body(out: &mut String, body: &str) {
    for c in body.chars() {
        match c {
            '\\' | '[' | ']' | '^' | '&' | '~' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
#[path = "pattern_tests.rs"]
mod tests;
