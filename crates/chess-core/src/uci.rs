//! Move token codec for the engine protocol.
//!
//! A token is 4 or 5 ASCII characters: origin file + rank, destination
//! file + rank, and an optional lowercase promotion letter (`q`, `r`, `b`, `n`).
//! Files run `a`..`h` left to right, ranks `1`..`8` from White's side.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use shakmaty::{File, Rank, Role, Square};

use crate::error::CoreError;

/// Piece kinds a pawn may promote to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromotionKind {
    Queen,
    Rook,
    Bishop,
    Knight,
}

impl PromotionKind {
    /// The fixed four-option menu, in display order.
    pub const ALL: [PromotionKind; 4] = [
        PromotionKind::Queen,
        PromotionKind::Rook,
        PromotionKind::Bishop,
        PromotionKind::Knight,
    ];

    pub fn letter(self) -> char {
        match self {
            PromotionKind::Queen => 'q',
            PromotionKind::Rook => 'r',
            PromotionKind::Bishop => 'b',
            PromotionKind::Knight => 'n',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            'q' => Some(PromotionKind::Queen),
            'r' => Some(PromotionKind::Rook),
            'b' => Some(PromotionKind::Bishop),
            'n' => Some(PromotionKind::Knight),
            _ => None,
        }
    }

    pub fn role(self) -> Role {
        match self {
            PromotionKind::Queen => Role::Queen,
            PromotionKind::Rook => Role::Rook,
            PromotionKind::Bishop => Role::Bishop,
            PromotionKind::Knight => Role::Knight,
        }
    }
}

impl FromStr for PromotionKind {
    type Err = CoreError;

    /// Accepts the piece name or its letter, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "queen" | "q" => Ok(PromotionKind::Queen),
            "rook" | "r" => Ok(PromotionKind::Rook),
            "bishop" | "b" => Ok(PromotionKind::Bishop),
            "knight" | "n" => Ok(PromotionKind::Knight),
            _ => Err(CoreError::UnknownPromotion(s.to_string())),
        }
    }
}

/// A half-move in protocol notation, e.g. `e2e4` or `a7a8n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MoveToken {
    pub origin: Square,
    pub destination: Square,
    pub promotion: Option<PromotionKind>,
}

impl MoveToken {
    pub fn new(origin: Square, destination: Square) -> Self {
        Self {
            origin,
            destination,
            promotion: None,
        }
    }

    pub fn with_promotion(self, kind: PromotionKind) -> Self {
        Self {
            promotion: Some(kind),
            ..self
        }
    }
}

/// Parse a two-character square name such as `e4`.
pub fn parse_square(s: &str) -> Option<Square> {
    let bytes = s.as_bytes();
    if bytes.len() != 2 {
        return None;
    }
    square_from_bytes(bytes[0], bytes[1])
}

fn square_from_bytes(file: u8, rank: u8) -> Option<Square> {
    if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
        return None;
    }
    Some(Square::from_coords(
        File::new(u32::from(file - b'a')),
        Rank::new(u32::from(rank - b'1')),
    ))
}

impl FromStr for MoveToken {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 4 && bytes.len() != 5 {
            return Err(CoreError::InvalidToken(s.to_string()));
        }

        let origin = square_from_bytes(bytes[0], bytes[1])
            .ok_or_else(|| CoreError::InvalidToken(s.to_string()))?;
        let destination = square_from_bytes(bytes[2], bytes[3])
            .ok_or_else(|| CoreError::InvalidToken(s.to_string()))?;

        let promotion = match bytes.get(4) {
            Some(&c) => Some(
                PromotionKind::from_letter(c as char)
                    .ok_or_else(|| CoreError::InvalidToken(s.to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            origin,
            destination,
            promotion,
        })
    }
}

impl fmt::Display for MoveToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.origin, self.destination)?;
        if let Some(kind) = self.promotion {
            write!(f, "{}", kind.letter())?;
        }
        Ok(())
    }
}

impl Serialize for MoveToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MoveToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Join a move list into the space-separated form used by `position startpos moves`.
pub fn join_tokens(moves: &[MoveToken]) -> String {
    moves
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
