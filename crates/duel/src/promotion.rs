//! A pawn move held back until the player picks a promotion piece.

use chess_core::{MoveToken, PromotionKind};
use serde::Serialize;
use shakmaty::Square;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromotionRequest {
    pub origin: Square,
    pub destination: Square,
}

impl PromotionRequest {
    pub fn new(origin: Square, destination: Square) -> Self {
        Self {
            origin,
            destination,
        }
    }

    /// The four pieces offered to the player.
    pub fn choices(&self) -> [PromotionKind; 4] {
        PromotionKind::ALL
    }

    /// The move to commit once a piece has been chosen.
    pub fn resolve(self, kind: PromotionKind) -> MoveToken {
        MoveToken::new(self.origin, self.destination).with_promotion(kind)
    }
}

impl Serialize for PromotionRequest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("PromotionRequest", 2)?;
        s.serialize_field("origin", &self.origin.to_string())?;
        s.serialize_field("destination", &self.destination.to_string())?;
        s.end()
    }
}
