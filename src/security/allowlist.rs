//! Path allowlist for forwarded requests.
//!
//! # Responsibilities
//! - Compile configured path patterns once, at startup
//! - Decide whether a request path may reach the local server
//!
//! # Design Decisions
//! - Empty pattern set = allow everything (not deny everything)
//! - OR semantics: any matching pattern admits the path
//! - Unanchored search; patterns anchor themselves with `^` if they need to
//! - Immutable after construction, shared via `Arc` without locking

use regex::Regex;
use thiserror::Error;

/// A pattern that failed to compile.
#[derive(Debug, Error)]
#[error("Invalid allowed_paths pattern '{pattern}': {source}")]
pub struct PatternError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Ordered set of compiled path patterns.
#[derive(Debug, Clone, Default)]
pub struct PathAllowlist {
    patterns: Vec<Regex>,
}

impl PathAllowlist {
    /// Compile every pattern. Fails on the first one that is not a valid regex.
    pub fn new<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let pattern = p.as_ref();
                Regex::new(pattern).map_err(|source| PatternError {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// Returns true if the path may be forwarded.
    pub fn allow(&self, path: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|re| re.is_match(path))
    }
}
