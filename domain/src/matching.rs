//! Predicates used to match numeric ids against a user-supplied needle.
//!
//! Ids are compared on their decimal string form. The legacy behavior is a
//! substring test; [`MatchMode::Exact`] is the corrected equality test.

/// Match an id's decimal representation against a needle.
pub trait MatchPredicate: Send + Sync {
    fn matches(&self, id: i64, needle: &str) -> bool;
}

/// Built-in predicates, selectable at runtime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// `needle` occurs anywhere in the id, e.g. `"2"` matches 12, 23 and 20.
    #[default]
    Substring,
    /// `needle` equals the id.
    Exact,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Substring => "substring",
            MatchMode::Exact => "exact",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "substring" => Some(MatchMode::Substring),
            "exact" => Some(MatchMode::Exact),
            _ => None,
        }
    }
}

impl MatchPredicate for MatchMode {
    fn matches(&self, id: i64, needle: &str) -> bool {
        let id = id.to_string();
        match self {
            MatchMode::Substring => id.contains(needle),
            MatchMode::Exact => id == needle,
        }
    }
}
