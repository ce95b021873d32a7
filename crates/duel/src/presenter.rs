//! Presentation boundary: the orchestrator reports, a presenter draws.

use std::io::Write;

use chess_core::pgn::{captured_by, movetext, piece_symbol};
use chess_core::rules::color_name;
use chess_core::{MoveToken, RulesEngine};
use shakmaty::{Color, File, Rank, Square};

use crate::evaluation::{EvaluationSample, ScoreKind};
use crate::promotion::PromotionRequest;

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    EngineReady,
    Evaluation(EvaluationSample),
    BoardChanged { last_move: Option<MoveToken> },
    Status(String),
    AiThinking,
    HintShown(MoveToken),
    /// A piece was picked up; these are its legal destinations.
    LegalMoves {
        origin: Square,
        destinations: Vec<Square>,
    },
    HintCleared,
    PromotionPending(PromotionRequest),
    GameOver(String),
}

pub trait Presenter {
    fn notify(&mut self, event: UiEvent, rules: &dyn RulesEngine);
}

/// Width of the evaluation bar in characters.
const BAR_WIDTH: usize = 30;

/// Plain-text presenter for a terminal.
pub struct TerminalPresenter<W> {
    out: W,
    orientation: Color,
    hint: Option<MoveToken>,
    last_move: Option<MoveToken>,
    selection: Option<(Square, Vec<Square>)>,
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W, orientation: Color) -> Self {
        Self {
            out,
            orientation,
            hint: None,
            last_move: None,
            selection: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw_board(&mut self, rules: &dyn RulesEngine) {
        let ranks: Vec<u32> = match self.orientation {
            Color::White => (0..8).rev().collect(),
            Color::Black => (0..8).collect(),
        };
        let files: Vec<u32> = match self.orientation {
            Color::White => (0..8).collect(),
            Color::Black => (0..8).rev().collect(),
        };

        let _ = writeln!(self.out);
        for &r in &ranks {
            let mut row = format!("{} ", r + 1);
            for &f in &files {
                let sq = Square::from_coords(File::new(f), Rank::new(r));
                let touches = |m: MoveToken| m.origin == sq || m.destination == sq;
                let selected = self.selection.as_ref().is_some_and(|(origin, targets)| {
                    *origin == sq || targets.contains(&sq)
                });
                let (open, close) = if selected {
                    ('<', '>')
                } else if self.hint.is_some_and(touches) {
                    ('(', ')')
                } else if self.last_move.is_some_and(touches) {
                    ('[', ']')
                } else {
                    (' ', ' ')
                };
                let glyph = match rules.piece_at(sq) {
                    Some(p) => piece_symbol(p.role, p.color),
                    None if (f + r) % 2 == 0 => '·',
                    None => ' ',
                };
                row.push(open);
                row.push(glyph);
                row.push(close);
            }
            let _ = writeln!(self.out, "{row}");
        }
        let labels: String = files
            .iter()
            .map(|&f| format!(" {} ", (b'a' + f as u8) as char))
            .collect();
        let _ = writeln!(self.out, "  {labels}");

        let history = rules.history();
        if !history.is_empty() {
            let _ = writeln!(self.out, "Moves: {}", movetext(history));
        }
        for side in [Color::White, Color::Black] {
            let taken: String = captured_by(history, side)
                .into_iter()
                .map(|role| piece_symbol(role, !side))
                .collect();
            if !taken.is_empty() {
                let _ = writeln!(self.out, "{} captured: {taken}", color_name(side));
            }
        }
    }

    fn draw_evaluation(&mut self, sample: &EvaluationSample) {
        let filled = ((sample.win_probability / 100.0) * BAR_WIDTH as f64).round() as usize;
        let filled = filled.min(BAR_WIDTH);
        let bar = format!("{}{}", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled));
        let mut line = format!("Eval [{bar}] {:.1}%", sample.win_probability);
        if sample.kind == ScoreKind::Mate {
            match sample.mating_side() {
                Some(side) if sample.score != 0 => {
                    line.push_str(&format!(" ({} mates in {})", color_name(side), sample.score.abs()));
                }
                _ => line.push_str(" (checkmate)"),
            }
        }
        let _ = writeln!(self.out, "{line}");
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn notify(&mut self, event: UiEvent, rules: &dyn RulesEngine) {
        match event {
            UiEvent::EngineReady => {
                let _ = writeln!(self.out, "Engine ready. Type `help` for commands.");
                self.draw_board(rules);
            }
            UiEvent::Evaluation(sample) => self.draw_evaluation(&sample),
            UiEvent::BoardChanged { last_move } => {
                self.last_move = last_move;
                self.selection = None;
                self.draw_board(rules);
            }
            UiEvent::LegalMoves {
                origin,
                destinations,
            } => {
                let listed: Vec<String> = destinations.iter().map(|sq| sq.to_string()).collect();
                self.selection = Some((origin, destinations));
                self.draw_board(rules);
                self.selection = None;
                if listed.is_empty() {
                    let _ = writeln!(self.out, "{origin} has no legal moves");
                } else {
                    let _ = writeln!(self.out, "{origin} can move to: {}", listed.join(" "));
                }
            }
            UiEvent::Status(text) => {
                let _ = writeln!(self.out, "{text}");
            }
            UiEvent::AiThinking => {
                let _ = writeln!(self.out, "Engine is thinking...");
            }
            UiEvent::HintShown(mv) => {
                self.hint = Some(mv);
                let _ = writeln!(self.out, "Hint: {mv}");
            }
            UiEvent::HintCleared => {
                self.hint = None;
            }
            UiEvent::PromotionPending(req) => {
                let _ = writeln!(
                    self.out,
                    "Promote {}{}: choose queen, rook, bishop or knight (q/r/b/n)",
                    req.origin, req.destination
                );
            }
            UiEvent::GameOver(text) => {
                let _ = writeln!(self.out, "Game over: {text}. Type `new` to play again.");
            }
        }
        let _ = self.out.flush();
    }
}
