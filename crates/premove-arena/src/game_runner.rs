//! The premove match loop.
//!
//! Every cycle both engines commit to a move against the same position before
//! either move is played. The side to move plays its premove if it is legal,
//! otherwise it gets one shallow fallback search. The other side then plays
//! the premove it committed to at the top of the cycle, which is checked
//! against the position as it is *after* the first move. A side that cannot
//! produce a legal move even at fallback depth resigns.

use crate::board::{side_name, Board, GameResult, Outcome, PlayedMove};
use crate::config::MatchSettings;
use crate::engine::{select_move, Engine};
use shakmaty::uci::UciMove;
use shakmaty::Color;
use std::fmt;

/// Where a played move came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveSource {
    /// The move committed to before the opponent's reply was known.
    Premove,
    /// The shallow search made after the premove turned out illegal.
    Fallback,
}

/// A single played move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    /// The move in UCI notation (e.g., "e2e4", "g1f3").
    pub uci: String,
    /// The move in SAN (e.g., "e4", "Nf3").
    pub san: String,
    /// The side that played it.
    pub color: Color,
    pub source: MoveSource,
}

impl MoveRecord {
    fn new(played: &PlayedMove, source: MoveSource) -> Self {
        Self {
            uci: played.uci.clone(),
            san: played.san.clone(),
            color: played.color,
            source,
        }
    }
}

/// How the match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEnd {
    /// The rules ended the game (mate, stalemate or a draw condition).
    GameOver(Outcome),
    /// The side could not produce a legal move and resigned.
    Resignation(Color),
    /// The ply ceiling was reached first.
    MoveLimit,
}

impl fmt::Display for MatchEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchEnd::GameOver(outcome) => write!(f, "{}", outcome.termination),
            MatchEnd::Resignation(color) => write!(f, "{} resigns", side_name(*color)),
            MatchEnd::MoveLimit => f.write_str("move limit reached"),
        }
    }
}

/// Per-side counters for the match summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SideStats {
    /// Moves played straight from the premove.
    pub premoves: usize,
    /// Moves played from the fallback search.
    pub fallbacks: usize,
}

/// The finished record of a match.
#[derive(Debug, Clone)]
pub struct GameRecord {
    /// The name of the engine playing white.
    pub white_name: String,
    /// The name of the engine playing black.
    pub black_name: String,
    /// Starting FEN, `None` for the standard starting position.
    pub start_fen: Option<String>,
    /// Side to move in the starting position.
    pub start_turn: Color,
    /// Full move number of the starting position.
    pub start_fullmove: u32,
    /// The moves played, in order.
    pub moves: Vec<MoveRecord>,
    pub result: GameResult,
    pub end: MatchEnd,
    pub white_stats: SideStats,
    pub black_stats: SideStats,
}

impl GameRecord {
    /// Returns the counters for `color`.
    pub fn stats(&self, color: Color) -> SideStats {
        match color {
            Color::White => self.white_stats,
            Color::Black => self.black_stats,
        }
    }
}

enum Turn {
    Played(MoveRecord),
    Resigned,
}

/// Runs one premove match between two engines.
///
/// # Example
///
/// ```ignore
/// let white = UciClient::spawn("./stockfish")?;
/// let black = UciClient::spawn("./lc0")?;
/// let mut runner = PremoveMatch::new(white, black, Board::new(), MatchSettings::default());
/// let record = runner.play();
/// println!("Result: {}", record.result);
/// ```
pub struct PremoveMatch<W, B> {
    white: W,
    black: B,
    board: Board,
    settings: MatchSettings,
    white_stats: SideStats,
    black_stats: SideStats,
}

impl<W: Engine, B: Engine> PremoveMatch<W, B> {
    /// Creates a match starting from `board`.
    pub fn new(white: W, black: B, board: Board, settings: MatchSettings) -> Self {
        Self {
            white,
            black,
            board,
            settings,
            white_stats: SideStats::default(),
            black_stats: SideStats::default(),
        }
    }

    /// Returns the live board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Gives the engines back, e.g. to shut them down gracefully.
    pub fn into_engines(self) -> (W, B) {
        (self.white, self.black)
    }

    fn engine_mut(&mut self, color: Color) -> &mut dyn Engine {
        match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }

    fn stats_mut(&mut self, color: Color) -> &mut SideStats {
        match color {
            Color::White => &mut self.white_stats,
            Color::Black => &mut self.black_stats,
        }
    }

    /// Plays the match to the end and returns its record.
    ///
    /// The loop stops when the rules end the game (draw claims included),
    /// when a side resigns, or when `max_moves` plies have been played.
    /// Engine failures never escape: they cost the side its premove or, if
    /// the fallback fails too, the game.
    pub fn play(&mut self) -> GameRecord {
        let mut moves: Vec<MoveRecord> = Vec::new();

        let end = loop {
            if let Some(outcome) = self.board.outcome(true) {
                break MatchEnd::GameOver(outcome);
            }
            if moves.len() >= self.settings.max_moves {
                break MatchEnd::MoveLimit;
            }

            let first = self.board.turn();
            let second = first.other();
            let (white_premove, black_premove) = self.request_premoves();
            let (first_premove, second_premove) = match first {
                Color::White => (white_premove, black_premove),
                Color::Black => (black_premove, white_premove),
            };

            match self.play_turn(first, first_premove) {
                Turn::Played(record) => moves.push(record),
                Turn::Resigned => break MatchEnd::Resignation(first),
            }

            if self.board.is_game_over(true) || moves.len() >= self.settings.max_moves {
                continue;
            }

            // Committed before `first` moved; re-validated, never re-requested.
            match self.play_turn(second, second_premove) {
                Turn::Played(record) => moves.push(record),
                Turn::Resigned => break MatchEnd::Resignation(second),
            }
        };

        let result = match end {
            MatchEnd::Resignation(color) => GameResult::win_for(color.other()),
            MatchEnd::GameOver(_) | MatchEnd::MoveLimit => self.board.result(true),
        };

        tracing::info!(
            "Match over after {} plies: {} ({})",
            moves.len(),
            result,
            end
        );

        GameRecord {
            white_name: self.white.name().to_string(),
            black_name: self.black.name().to_string(),
            start_fen: self.board.start_fen().map(str::to_string),
            start_turn: self.board.start_turn(),
            start_fullmove: self.board.start_fullmove(),
            moves,
            result,
            end,
            white_stats: self.white_stats,
            black_stats: self.black_stats,
        }
    }

    /// Asks both engines for a premove against the current position.
    ///
    /// Returns `(white, black)`. Neither query mutates the board, so running
    /// them concurrently gives the same answers as running them in turn.
    fn request_premoves(&mut self) -> (Option<UciMove>, Option<UciMove>) {
        let depth = self.settings.premove_depth;

        if !self.settings.concurrent_premoves {
            let white = select_move(&mut self.white, &self.board, depth);
            let black = select_move(&mut self.black, &self.board, depth);
            return (white, black);
        }

        let board = &self.board;
        let white_engine = &mut self.white;
        let black_engine = &mut self.black;
        std::thread::scope(|s| {
            let white = s.spawn(move || select_move(white_engine, board, depth));
            let black = select_move(black_engine, board, depth);
            let white = white.join().unwrap_or_else(|_| {
                tracing::warn!("White premove query panicked");
                None
            });
            (white, black)
        })
    }

    /// Plays one side's move: the premove if legal, else one fallback search.
    fn play_turn(&mut self, color: Color, premove: Option<UciMove>) -> Turn {
        if let Some(played) = self.board.try_apply(premove.as_ref()) {
            let record = MoveRecord::new(played, MoveSource::Premove);
            self.stats_mut(color).premoves += 1;
            return Turn::Played(record);
        }

        match &premove {
            Some(m) => tracing::info!(
                "{} premove {} is illegal, falling back to depth {}",
                side_name(color),
                m,
                self.settings.fallback_depth
            ),
            None => tracing::info!(
                "{} has no premove, falling back to depth {}",
                side_name(color),
                self.settings.fallback_depth
            ),
        }

        let depth = self.settings.fallback_depth;
        let fallback = {
            let board = &self.board;
            let engine: &mut dyn Engine = match color {
                Color::White => &mut self.white,
                Color::Black => &mut self.black,
            };
            select_move(engine, board, depth)
        };

        if let Some(played) = self.board.try_apply(fallback.as_ref()) {
            let record = MoveRecord::new(played, MoveSource::Fallback);
            self.stats_mut(color).fallbacks += 1;
            return Turn::Played(record);
        }

        tracing::warn!(
            "{} ({}) cannot produce a legal move and resigns",
            side_name(color),
            self.engine_mut(color).name()
        );
        Turn::Resigned
    }
}
