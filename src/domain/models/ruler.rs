//! Built-in ruler names.

use serde::{Deserialize, Serialize};

/// Strategies shipped with the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinRuler {
    /// Uniform pick over the registered pieces, ignoring scores.
    Random,
    /// Pick the piece with the greatest success score.
    Highest,
}

impl BuiltinRuler {
    pub const ALL: [Self; 2] = [Self::Random, Self::Highest];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Highest => "highest",
        }
    }
}

/// Ruler used by a trial when the namespace has no ruler history.
pub const DEFAULT_RULER: BuiltinRuler = BuiltinRuler::Random;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_match_serialized_form() {
        for ruler in BuiltinRuler::ALL {
            let json = serde_json::to_string(&ruler).unwrap();
            assert_eq!(json, format!("\"{}\"", ruler.as_str()));
        }
        assert_ne!(BuiltinRuler::Random.as_str(), BuiltinRuler::Highest.as_str());
    }
}
