//! Namespace derivation and storage key layout.
//!
//! A label set identifies a decision point. Labels are sorted and joined with
//! [`NAMESPACE_SEPARATOR`] so that every permutation of the same set maps to
//! the same namespace. Each namespace owns four storage keys:
//!
//! ```text
//! <prefix>:<namespace>:piece:list    scored set of candidate pieces
//! <prefix>:<namespace>:piece:used    piece chosen by the latest execution
//! <prefix>:<namespace>:ruler:list    scored set of rulers
//! <prefix>:<namespace>:ruler:used    ruler chosen by the latest trial
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator joining sorted labels into a namespace.
pub const NAMESPACE_SEPARATOR: &str = "-";

/// Separator used when rendering a [`PieceKey`]. Distinct from
/// [`NAMESPACE_SEPARATOR`].
pub const PIECE_KEY_SEPARATOR: char = '/';

/// Default storage key prefix.
pub const DEFAULT_KEY_PREFIX: &str = "service:configuration:namespace";

/// Deterministic identifier derived from an unordered label set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Namespace(String);

impl Namespace {
    /// Derive the namespace for a label set. Order of `labels` is irrelevant.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut sorted: Vec<&str> = labels.iter().map(AsRef::as_ref).collect();
        sorted.sort_unstable();
        Self(sorted.join(NAMESPACE_SEPARATOR))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds storage keys under a fixed system prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn namespace_key(&self, namespace: &Namespace) -> String {
        format!("{}:{}", self.prefix, namespace)
    }

    pub fn piece_list_key(&self, namespace: &Namespace) -> String {
        format!("{}:piece:list", self.namespace_key(namespace))
    }

    /// Key holding the piece chosen by the most recent execution.
    pub fn piece_used_key(&self, namespace: &Namespace) -> String {
        format!("{}:piece:used", self.namespace_key(namespace))
    }

    pub fn ruler_list_key(&self, namespace: &Namespace) -> String {
        format!("{}:ruler:list", self.namespace_key(namespace))
    }

    /// Key holding the ruler chosen by the most recent trial.
    pub fn ruler_used_key(&self, namespace: &Namespace) -> String {
        format!("{}:ruler:used", self.namespace_key(namespace))
    }

    /// Derive the namespace for `labels` and all of its keys at once.
    pub fn keys_for<S: AsRef<str>>(&self, labels: &[S]) -> NamespaceKeys {
        let namespace = Namespace::from_labels(labels);
        NamespaceKeys {
            piece_list: self.piece_list_key(&namespace),
            piece_used: self.piece_used_key(&namespace),
            ruler_list: self.ruler_list_key(&namespace),
            ruler_used: self.ruler_used_key(&namespace),
            namespace,
        }
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}

/// The namespace of a label set together with its four storage keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceKeys {
    pub namespace: Namespace,
    pub piece_list: String,
    pub piece_used: String,
    pub ruler_list: String,
    pub ruler_used: String,
}

impl NamespaceKeys {
    /// Local cache key for a piece of this namespace.
    pub fn piece_key(&self, piece_id: impl Into<String>) -> PieceKey {
        PieceKey {
            list_key: self.piece_list.clone(),
            piece_id: piece_id.into(),
        }
    }
}

/// Structured local-cache key: the owning piece-list key plus a piece id.
///
/// Membership in a namespace is an exact comparison of `list_key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PieceKey {
    pub list_key: String,
    pub piece_id: String,
}

impl PieceKey {
    pub fn belongs_to(&self, list_key: &str) -> bool {
        self.list_key == list_key
    }
}

impl fmt::Display for PieceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.list_key, PIECE_KEY_SEPARATOR, self.piece_id)
    }
}
