//! Rules engine: legality, move commit, history and game status.
//!
//! The orchestrator only talks to the [`RulesEngine`] trait; [`Game`] backs it
//! with shakmaty.

use serde::Serialize;
use shakmaty::san::San;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, Move, Piece, Position, Rank, Role, Square};

use crate::error::CoreError;
use crate::uci::{MoveToken, PromotionKind};

/// A committed half-move as kept in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayedMove {
    pub token: MoveToken,
    /// SAN with `+` / `#` suffix.
    pub san: String,
    #[serde(skip)]
    pub mover: Color,
    #[serde(skip)]
    pub captured: Option<Role>,
}

pub trait RulesEngine {
    fn piece_at(&self, square: Square) -> Option<Piece>;

    fn is_legal(&self, mv: &MoveToken) -> bool;

    fn commit(&mut self, mv: &MoveToken) -> Result<&PlayedMove, CoreError>;

    fn history(&self) -> &[PlayedMove];

    fn side_to_move(&self) -> Color;

    fn is_game_over(&self) -> bool;

    fn reset(&mut self);

    fn undo_last_move(&mut self) -> Option<PlayedMove>;

    fn status_text(&self) -> String;

    /// Whether `origin -> destination` is a pawn reaching its last rank,
    /// i.e. a move that cannot be committed without a promotion kind.
    fn is_promotion_move(&self, origin: Square, destination: Square) -> bool {
        match self.piece_at(origin) {
            Some(piece) if piece.role == Role::Pawn => {
                let last = match piece.color {
                    Color::White => Rank::Eighth,
                    Color::Black => Rank::First,
                };
                destination.rank() == last
            }
            _ => false,
        }
    }

    /// Squares the piece on `origin` can legally move to. Pawn moves to the
    /// last rank count once, whatever the promotion piece.
    fn legal_destinations(&self, origin: Square) -> Vec<Square> {
        Square::ALL
            .into_iter()
            .filter(|&destination| {
                let mv = MoveToken::new(origin, destination);
                if self.is_promotion_move(origin, destination) {
                    self.is_legal(&mv.with_promotion(PromotionKind::Queen))
                } else {
                    self.is_legal(&mv)
                }
            })
            .collect()
    }

    fn history_tokens(&self) -> Vec<MoveToken> {
        self.history().iter().map(|m| m.token).collect()
    }
}

pub fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "White",
        Color::Black => "Black",
    }
}

/// Standard chess from the initial position, with undo.
#[derive(Debug, Clone, Default)]
pub struct Game {
    position: Chess,
    /// Position before each committed move, parallel to `history`.
    previous: Vec<Chess>,
    history: Vec<PlayedMove>,
}

impl Game {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    fn find_legal(&self, mv: &MoveToken) -> Option<Move> {
        let uci = UciMove::Normal {
            from: mv.origin,
            to: mv.destination,
            promotion: mv.promotion.map(|k| k.role()),
        };
        uci.to_move(&self.position).ok()
    }
}

/// The standard-notation token for a legal move. King-takes-rook castling
/// input comes back as the king's two-square step.
fn canonical_token(legal: Move, requested: &MoveToken) -> MoveToken {
    match legal.to_uci(CastlingMode::Standard) {
        UciMove::Normal { from, to, .. } => MoveToken {
            origin: from,
            destination: to,
            promotion: requested.promotion,
        },
        _ => *requested,
    }
}

impl RulesEngine for Game {
    fn piece_at(&self, square: Square) -> Option<Piece> {
        self.position.board().piece_at(square)
    }

    fn is_legal(&self, mv: &MoveToken) -> bool {
        self.find_legal(mv).is_some()
    }

    fn commit(&mut self, mv: &MoveToken) -> Result<&PlayedMove, CoreError> {
        let legal = self
            .find_legal(mv)
            .ok_or_else(|| CoreError::IllegalMove(mv.to_string()))?;

        let mover = self.position.turn();
        let san = San::from_move(&self.position, legal.clone()).to_string();
        let captured = legal.capture();
        let token = canonical_token(legal, mv);

        let mut next = self.position.clone();
        next.play_unchecked(legal.clone());

        let suffix = if next.is_checkmate() {
            "#"
        } else if next.is_check() {
            "+"
        } else {
            ""
        };

        let before = std::mem::replace(&mut self.position, next);
        self.previous.push(before);
        self.history.push(PlayedMove {
            token,
            san: format!("{san}{suffix}"),
            mover,
            captured,
        });

        self.history
            .last()
            .ok_or_else(|| CoreError::IllegalMove(mv.to_string()))
    }

    fn history(&self) -> &[PlayedMove] {
        &self.history
    }

    fn side_to_move(&self) -> Color {
        self.position.turn()
    }

    fn is_game_over(&self) -> bool {
        self.position.is_checkmate()
            || self.position.is_stalemate()
            || self.position.is_insufficient_material()
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn undo_last_move(&mut self) -> Option<PlayedMove> {
        let before = self.previous.pop()?;
        self.position = before;
        self.history.pop()
    }

    fn status_text(&self) -> String {
        let side = self.position.turn();
        if self.position.is_checkmate() {
            format!("Checkmate, {} wins", color_name(!side))
        } else if self.position.is_stalemate() {
            "Stalemate, draw".to_string()
        } else if self.position.is_insufficient_material() {
            "Draw by insufficient material".to_string()
        } else if self.position.is_check() {
            format!("{} to move, in check", color_name(side))
        } else {
            format!("{} to move", color_name(side))
        }
    }
}
