//! PGN (Portable Game Notation) export.
//!
//! The match is written once, after it has finished, so the file always holds
//! a complete game that chess software and analysis sites can import.

use crate::game_runner::GameRecord;
use chrono::Utc;
use shakmaty::Color;
use std::path::Path;

/// Maximum length of a move text line.
const LINE_WIDTH: usize = 80;

/// Header values that do not come from the game itself.
#[derive(Debug, Clone)]
pub struct PgnHeaders {
    pub event: String,
    pub site: String,
    /// Date in PGN format (`YYYY.MM.DD`).
    pub date: String,
}

impl PgnHeaders {
    /// Creates headers dated today.
    pub fn new(event: impl Into<String>, site: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            site: site.into(),
            date: Utc::now().format("%Y.%m.%d").to_string(),
        }
    }
}

impl Default for PgnHeaders {
    fn default() -> Self {
        Self::new("Premove Match", "local")
    }
}

/// Renders a finished game as PGN text.
///
/// The output holds the Seven Tag Roster, `SetUp`/`FEN` tags when the game
/// started from a custom position, and the SAN move text wrapped at 80
/// columns and terminated by the result.
pub fn to_pgn(record: &GameRecord, headers: &PgnHeaders) -> String {
    let result = record.result.as_pgn();
    let mut out = String::new();

    let mut tag = |name: &str, value: &str| {
        out.push_str(&format!("[{} \"{}\"]\n", name, escape(value)));
    };
    tag("Event", &headers.event);
    tag("Site", &headers.site);
    tag("Date", &headers.date);
    tag("Round", "1");
    tag("White", &record.white_name);
    tag("Black", &record.black_name);
    tag("Result", result);
    if let Some(fen) = &record.start_fen {
        tag("SetUp", "1");
        tag("FEN", fen);
    }
    out.push('\n');

    let mut tokens = Vec::with_capacity(record.moves.len() * 3 / 2 + 1);
    let mut number = record.start_fullmove;
    for (i, mv) in record.moves.iter().enumerate() {
        match mv.color {
            Color::White => tokens.push(format!("{}.", number)),
            Color::Black if i == 0 => tokens.push(format!("{}...", number)),
            Color::Black => {}
        }
        tokens.push(mv.san.clone());
        if mv.color == Color::Black {
            number += 1;
        }
    }
    tokens.push(result.to_string());

    let mut line = String::new();
    for token in tokens {
        if !line.is_empty() && line.len() + 1 + token.len() > LINE_WIDTH {
            out.push_str(&line);
            out.push('\n');
            line.clear();
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&token);
    }
    out.push_str(&line);
    out.push('\n');

    out
}

/// Writes a finished game to a PGN file, replacing any existing file.
pub fn write_pgn<P: AsRef<Path>>(
    path: P,
    record: &GameRecord,
    headers: &PgnHeaders,
) -> std::io::Result<()> {
    std::fs::write(path, to_pgn(record, headers))
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::GameResult;
    use crate::game_runner::{MatchEnd, MoveRecord, MoveSource, SideStats};
    use std::fs;

    fn headers() -> PgnHeaders {
        PgnHeaders {
            event: "Test Match".to_string(),
            site: "local".to_string(),
            date: "2024.01.02".to_string(),
        }
    }

    fn mv(san: &str, color: Color) -> MoveRecord {
        MoveRecord {
            uci: String::new(),
            san: san.to_string(),
            color,
            source: MoveSource::Premove,
        }
    }

    /// Helper function to create a test game record.
    fn create_test_record(moves: Vec<MoveRecord>, result: GameResult) -> GameRecord {
        GameRecord {
            white_name: "TestEngineWhite".to_string(),
            black_name: "TestEngineBlack".to_string(),
            start_fen: None,
            start_turn: Color::White,
            start_fullmove: 1,
            moves,
            result,
            end: MatchEnd::MoveLimit,
            white_stats: SideStats::default(),
            black_stats: SideStats::default(),
        }
    }

    fn ruy_lopez() -> Vec<MoveRecord> {
        vec![
            mv("e4", Color::White),
            mv("e5", Color::Black),
            mv("Nf3", Color::White),
            mv("Nc6", Color::Black),
            mv("Bb5", Color::White),
        ]
    }

    #[test]
    fn test_headers() {
        let pgn = to_pgn(
            &create_test_record(ruy_lopez(), GameResult::WhiteWins),
            &headers(),
        );

        assert!(pgn.starts_with("[Event \"Test Match\"]\n"));
        assert!(pgn.contains("[Site \"local\"]"));
        assert!(pgn.contains("[Date \"2024.01.02\"]"));
        assert!(pgn.contains("[Round \"1\"]"));
        assert!(pgn.contains("[White \"TestEngineWhite\"]"));
        assert!(pgn.contains("[Black \"TestEngineBlack\"]"));
        assert!(pgn.contains("[Result \"1-0\"]"));
        assert!(!pgn.contains("[FEN"));
    }

    #[test]
    fn test_move_text() {
        let pgn = to_pgn(
            &create_test_record(ruy_lopez(), GameResult::Undecided),
            &headers(),
        );
        assert!(pgn.ends_with("\n\n1. e4 e5 2. Nf3 Nc6 3. Bb5 *\n"));
    }

    #[test]
    fn test_black_wins_and_draw_terminators() {
        let black = to_pgn(
            &create_test_record(ruy_lopez(), GameResult::BlackWins),
            &headers(),
        );
        assert!(black.contains("[Result \"0-1\"]"));
        assert!(black.trim_end().ends_with("0-1"));

        let draw = to_pgn(&create_test_record(vec![], GameResult::Draw), &headers());
        assert!(draw.contains("[Result \"1/2-1/2\"]"));
        assert!(draw.ends_with("\n\n1/2-1/2\n"));
    }

    #[test]
    fn test_custom_start_with_black_to_move() {
        let mut record = create_test_record(
            vec![mv("e5", Color::Black), mv("Nf3", Color::White)],
            GameResult::Undecided,
        );
        record.start_fen =
            Some("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1".to_string());
        record.start_turn = Color::Black;

        let pgn = to_pgn(&record, &headers());
        assert!(pgn.contains("[SetUp \"1\"]"));
        assert!(pgn.contains(
            "[FEN \"rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1\"]"
        ));
        assert!(pgn.contains("1... e5 2. Nf3 *"));
    }

    #[test]
    fn test_long_games_wrap_at_80_columns() {
        let mut moves = Vec::new();
        for _ in 0..40 {
            moves.push(mv("Nf3", Color::White));
            moves.push(mv("Nf6", Color::Black));
        }
        let pgn = to_pgn(&create_test_record(moves, GameResult::Draw), &headers());

        let move_lines: Vec<&str> = pgn.split("\n\n").nth(1).unwrap().lines().collect();
        assert!(move_lines.len() > 1);
        assert!(move_lines.iter().all(|l| l.len() <= LINE_WIDTH));
        assert!(move_lines.iter().all(|l| !l.starts_with(' ')));
        assert!(move_lines.last().unwrap().ends_with("1/2-1/2"));
    }

    #[test]
    fn test_names_are_escaped() {
        let mut record = create_test_record(vec![], GameResult::Draw);
        record.white_name = "Say \"hi\"".to_string();
        let pgn = to_pgn(&record, &headers());
        assert!(pgn.contains("[White \"Say \\\"hi\\\"\"]"));
    }

    #[test]
    fn test_write_pgn_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let pgn_path = dir.path().join("test_game.pgn");

        let record = create_test_record(ruy_lopez(), GameResult::WhiteWins);
        write_pgn(&pgn_path, &record, &headers()).expect("Failed to write PGN file");

        let contents = fs::read_to_string(&pgn_path).expect("Failed to read PGN file");
        assert_eq!(contents, to_pgn(&record, &headers()));
    }
}
