//! Piece and selection models.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result values attached to a piece of configuration.
pub type PieceResults = Vec<Value>;

/// Outcome of one `execute` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Identifier of the chosen piece.
    pub piece_id: String,
    /// Name of the ruler that chose it.
    pub ruler: String,
    /// Results registered for the piece, empty when none are cached.
    pub results: PieceResults,
}
