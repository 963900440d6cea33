//! Option name sanitization
//!
//! Raw option names are turned into canonical keys before they touch any
//! cache or store. The transformation itself is a host primitive
//! ([`Slugger`]); [`NameSanitizer`] adds trimming, the empty-name rule and
//! per-instance memoization.

use parking_lot::RwLock;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Sanitized, URL-safe option key. Never empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for CanonicalKey {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CanonicalKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CanonicalKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host slug transformation
pub trait Slugger: Send + Sync {
    fn slug(&self, raw: &str) -> String;
}

/// Default slug: accents stripped, lower-cased, `[a-z0-9_-]` kept.
///
/// Whitespace, `.` and `/` become separators; runs of separators collapse
/// to a single `-` and never lead or trail. Any other character is dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct DashSlugger;

impl Slugger for DashSlugger {
    fn slug(&self, raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        let mut separator = false;

        for c in raw.nfd().filter(|c| !is_combining_mark(*c)) {
            let kept = match c {
                'a'..='z' | '0'..='9' | '_' => Some(c),
                'A'..='Z' => Some(c.to_ascii_lowercase()),
                '-' | '.' | '/' => None,
                c if c.is_whitespace() => None,
                _ => continue,
            };

            match kept {
                Some(c) => {
                    if separator && !out.is_empty() {
                        out.push('-');
                    }
                    separator = false;
                    out.push(c);
                }
                None => separator = true,
            }
        }

        out
    }
}

/// Memoizing name sanitizer
pub struct NameSanitizer {
    slugger: Arc<dyn Slugger>,
    /// Keyed by the raw input
    memo: RwLock<HashMap<String, Option<CanonicalKey>>>,
}

impl Default for NameSanitizer {
    fn default() -> Self {
        Self::new(Arc::new(DashSlugger))
    }
}

impl NameSanitizer {
    pub fn new(slugger: Arc<dyn Slugger>) -> Self {
        Self {
            slugger,
            memo: RwLock::new(HashMap::new()),
        }
    }

    /// Canonical key for `raw`, or `None` if the name is empty, blank or
    /// slugs to nothing.
    pub fn sanitize(&self, raw: &str) -> Option<CanonicalKey> {
        if let Some(hit) = self.memo.read().get(raw) {
            return hit.clone();
        }

        let trimmed = raw.trim();
        let key = if trimmed.is_empty() {
            None
        } else {
            let slug = self.slugger.slug(trimmed);
            (!slug.is_empty()).then_some(CanonicalKey(slug))
        };

        self.memo.write().insert(raw.to_string(), key.clone());
        key
    }

    /// Number of memoized raw names
    pub fn memo_len(&self) -> usize {
        self.memo.read().len()
    }
}
