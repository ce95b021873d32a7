//! Move history formatting: numbered SAN movetext and captured material.

use shakmaty::{Color, Role};

use crate::rules::PlayedMove;

/// Render the history as numbered movetext, e.g. `1. e4 e5 2. Nf3`.
pub fn movetext(history: &[PlayedMove]) -> String {
    let mut out = String::new();
    for (i, pair) in history.chunks(2).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{}. {}", i + 1, pair[0].san));
        if let Some(reply) = pair.get(1) {
            out.push(' ');
            out.push_str(&reply.san);
        }
    }
    out
}

/// Roles captured by `side`, in the order they were taken.
pub fn captured_by(history: &[PlayedMove], side: Color) -> Vec<Role> {
    history
        .iter()
        .filter(|m| m.mover == side)
        .filter_map(|m| m.captured)
        .collect()
}

/// Piece symbol for captured material display (colour of the captured piece).
pub fn piece_symbol(role: Role, color: Color) -> char {
    match (color, role) {
        (Color::White, Role::Pawn) => '♙',
        (Color::White, Role::Knight) => '♘',
        (Color::White, Role::Bishop) => '♗',
        (Color::White, Role::Rook) => '♖',
        (Color::White, Role::Queen) => '♕',
        (Color::White, Role::King) => '♔',
        (Color::Black, Role::Pawn) => '♟',
        (Color::Black, Role::Knight) => '♞',
        (Color::Black, Role::Bishop) => '♝',
        (Color::Black, Role::Rook) => '♜',
        (Color::Black, Role::Queen) => '♛',
        (Color::Black, Role::King) => '♚',
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Game, RulesEngine};

    fn played(moves: &[&str]) -> Game {
        let mut game = Game::new();
        for m in moves {
            game.commit(&m.parse().unwrap()).unwrap();
        }
        game
    }

    #[test]
    fn test_movetext_numbering() {
        let game = played(&["e2e4", "e7e5", "g1f3"]);
        assert_eq!(movetext(game.history()), "1. e4 e5 2. Nf3");
        assert_eq!(movetext(&[]), "");
    }

    #[test]
    fn test_captured_by_side() {
        let game = played(&["e2e4", "d7d5", "e4d5", "d8d5"]);
        assert_eq!(captured_by(game.history(), Color::White), vec![Role::Pawn]);
        assert_eq!(captured_by(game.history(), Color::Black), vec![Role::Pawn]);
    }
}
