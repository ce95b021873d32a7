//! Session-level behaviour over a recorded transport.

mod common;

use chess_core::shakmaty::Color;
use chess_core::MoveToken;
use duel::evaluation::ScoreKind;
use duel::protocol::SearchParameters;
use duel::session::{Admission, AnalysisRequest, Purpose, Rejection, SessionEvent};
use duel::AnalysisSession;

use common::{tok, Recorder};

fn request(moves: &[&str], params: SearchParameters) -> AnalysisRequest {
    AnalysisRequest {
        position: moves.iter().map(|m| tok(m)).collect::<Vec<MoveToken>>(),
        params,
        generation: 7,
        purpose: Purpose::Turn,
    }
}

fn ready() -> AnalysisSession<Recorder> {
    let mut session = AnalysisSession::connect(Recorder::default(), 3).unwrap();
    session.handle_line("id name Stockfish 16").unwrap();
    session.handle_line("option name MultiPV type spin default 1 min 1 max 500").unwrap();
    session.handle_line("uciok").unwrap();
    session
}

#[test]
fn test_at_most_one_search_outstanding() {
    let mut session = ready();
    let mut accepted = 0;
    for _ in 0..5 {
        match session.try_request(request(&[], SearchParameters::EngineDefault)).unwrap() {
            Admission::Accepted(_) => accepted += 1,
            Admission::Rejected(reason) => assert_eq!(reason, Rejection::Busy),
        }
    }
    assert_eq!(accepted, 1);
    let go_count = session.transport().sent.iter().filter(|c| c.starts_with("go")).count();
    assert_eq!(go_count, 1);

    session.handle_line("bestmove e2e4").unwrap();
    assert_eq!(session.searches_sent(), session.resolved());
}

#[test]
fn test_search_bounds_reach_the_wire() {
    let mut session = ready();
    let clock = duel::config::parse_search_mode("clock", 1000, 300_000, 2000).unwrap();
    session.try_request(request(&["e2e4"], clock)).unwrap();
    assert_eq!(
        session.transport().sent.last().unwrap(),
        "go wtime 300000 btime 300000 winc 2000 binc 2000"
    );
}

#[test]
fn test_scores_reported_from_whites_side() {
    let mut session = ready();
    session.try_request(request(&["e2e4"], SearchParameters::Depth(10))).unwrap();

    // MultiPV secondaries never drive the evaluation.
    assert_eq!(
        session.handle_line("info depth 10 multipv 2 score cp -400 pv a7a6").unwrap(),
        None
    );

    let event = session
        .handle_line("info depth 10 multipv 1 score mate 3 pv d8h4")
        .unwrap();
    let Some(SessionEvent::Evaluation { ticket, sample }) = event else {
        panic!("expected an evaluation");
    };
    assert_eq!(ticket.generation, 7);
    assert_eq!(sample.kind, ScoreKind::Mate);
    assert_eq!(sample.score, -3);
    assert_eq!(sample.mating_side(), Some(Color::Black));
    assert_eq!(sample.win_probability, 0.0);
}
