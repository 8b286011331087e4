//! UCI (Universal Chess Interface) client for engine subprocesses.
//!
//! This module spawns a UCI-compatible chess engine and drives the small part
//! of the protocol a premove match needs: the handshake, options, a new game,
//! and depth-limited searches of the live position.
//!
//! # Example
//!
//! ```no_run
//! use premove_arena::board::Board;
//! use premove_arena::uci_client::UciClient;
//!
//! let mut client = UciClient::spawn("/usr/bin/stockfish").unwrap();
//! client.init().unwrap();
//! client.new_game().unwrap();
//! let best_move = client.go_depth(&Board::new(), 6).unwrap();
//! println!("Best move: {:?}", best_move);
//! client.quit().unwrap();
//! ```

use crate::board::Board;
use crate::engine::Engine;
use shakmaty::uci::UciMove;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use thiserror::Error;

/// Maximum number of lines to read before giving up on a UCI response.
pub const MAX_UCI_LINES: usize = 100_000;

/// Errors that can occur when communicating with a UCI engine.
#[derive(Error, Debug)]
pub enum UciError {
    /// The engine executable could not be started.
    #[error("Failed to spawn {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Reading from or writing to the engine pipes failed.
    #[error("Engine I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The engine closed its output, usually because it crashed.
    #[error("Engine closed its output")]
    Disconnected,
    /// The engine process is not ready to receive commands.
    #[error("Process not ready")]
    NotReady,
    /// The engine returned an invalid or unexpected response.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// A client for communicating with a UCI-compatible chess engine.
///
/// The engine process lives exactly as long as the client: dropping a
/// `UciClient` sends `quit` and kills the process if it is still running,
/// so every exit path of a match shuts its engines down.
///
/// # Lifecycle
///
/// 1. Spawn the engine with [`UciClient::spawn`]
/// 2. Initialize the UCI protocol with [`UciClient::init`]
/// 3. Optionally configure it with [`UciClient::set_option`]
/// 4. Start a game with [`UciClient::new_game`]
/// 5. Request moves with [`UciClient::go_depth`]
/// 6. Clean up with [`UciClient::quit`] (or rely on [`Drop`])
pub struct UciClient {
    /// The child process handle.
    process: Child,
    /// Handle to write commands to the engine's stdin.
    stdin: ChildStdin,
    /// Buffered reader for the engine's stdout.
    stdout: BufReader<ChildStdout>,
    /// The engine's name as reported during UCI initialization.
    pub name: String,
    closed: bool,
}

impl UciClient {
    /// Spawns a new UCI engine process.
    ///
    /// The process is not yet initialized for UCI communication; call
    /// [`init`](Self::init) after spawning.
    ///
    /// # Errors
    ///
    /// Returns [`UciError::Spawn`] if the process cannot be spawned,
    /// typically because the executable doesn't exist or lacks permissions.
    pub fn spawn<P: AsRef<Path>>(path: P) -> Result<Self, UciError> {
        let path = path.as_ref();
        let mut process = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| UciError::Spawn {
                path: path.to_path_buf(),
                source,
            })?;

        let stdin = process.stdin.take().ok_or(UciError::NotReady)?;
        let stdout = BufReader::new(process.stdout.take().ok_or(UciError::NotReady)?);

        Ok(Self {
            process,
            stdin,
            stdout,
            name: String::new(),
            closed: false,
        })
    }

    /// Sends a command line to the engine and flushes it.
    pub fn send(&mut self, cmd: &str) -> Result<(), UciError> {
        tracing::trace!("> {}", cmd);
        writeln!(self.stdin, "{}", cmd)?;
        self.stdin.flush()?;
        Ok(())
    }

    /// Reads a single trimmed line from the engine's stdout.
    ///
    /// # Errors
    ///
    /// Returns [`UciError::Disconnected`] at end of stream.
    pub fn read_line(&mut self) -> Result<String, UciError> {
        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Err(UciError::Disconnected);
        }
        let line = line.trim().to_string();
        tracing::trace!("< {}", line);
        Ok(line)
    }

    /// Reads lines until `done` matches one, returning that line.
    fn read_until(&mut self, mut done: impl FnMut(&str) -> bool) -> Result<String, UciError> {
        for _ in 0..MAX_UCI_LINES {
            let line = self.read_line()?;
            if done(&line) {
                return Ok(line);
            }
        }
        Err(UciError::InvalidResponse(format!(
            "no answer within {} lines",
            MAX_UCI_LINES
        )))
    }

    /// Initializes the UCI protocol with the engine.
    ///
    /// Sends `uci` and waits for `uciok`, capturing the engine's name from
    /// the `id name` response, then waits until the engine is ready.
    pub fn init(&mut self) -> Result<(), UciError> {
        self.send("uci")?;

        let mut name = String::new();
        self.read_until(|line| {
            if let Some(id) = line.strip_prefix("id name ") {
                name = id.trim().to_string();
            }
            line == "uciok"
        })?;
        self.name = name;

        self.sync()
    }

    /// Sends `isready` and waits for `readyok`.
    pub fn sync(&mut self) -> Result<(), UciError> {
        self.send("isready")?;
        self.read_until(|line| line == "readyok")?;
        Ok(())
    }

    /// Sets a UCI option (e.g. `Threads`, `Hash`, `WeightsFile`).
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), UciError> {
        self.send(&format!("setoption name {} value {}", name, value))
    }

    /// Tells the engine a new game starts and waits until it is ready.
    pub fn new_game(&mut self) -> Result<(), UciError> {
        self.send("ucinewgame")?;
        self.sync()
    }

    /// Sends the `position` command describing `board`.
    ///
    /// The engine receives the starting position and the full list of moves
    /// played, so it can see repetitions the same way the board does.
    pub fn set_position(&mut self, board: &Board) -> Result<(), UciError> {
        self.send(&position_command(board))
    }

    /// Searches `board` to `depth` plies and returns the engine's best move.
    ///
    /// Returns `Ok(None)` when the engine answers `bestmove (none)` or the
    /// null move `0000`.
    ///
    /// # Errors
    ///
    /// Returns [`UciError::InvalidResponse`] if the best move is not valid
    /// UCI notation.
    pub fn go_depth(&mut self, board: &Board, depth: u32) -> Result<Option<UciMove>, UciError> {
        self.set_position(board)?;
        self.send(&format!("go depth {}", depth))?;

        let line = self.read_until(|line| line.starts_with("bestmove"))?;
        parse_bestmove(&line)
    }

    /// Gracefully shuts down the UCI engine.
    ///
    /// Sends the `quit` command and waits for the process to exit.
    pub fn quit(&mut self) -> Result<(), UciError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.send("quit")?;
        self.process.wait()?;
        Ok(())
    }
}

impl Engine for UciClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn best_move(&mut self, board: &Board, depth: u32) -> Result<Option<UciMove>, UciError> {
        self.go_depth(board, depth)
    }
}

impl Drop for UciClient {
    /// Sends `quit` if the engine is still open, then makes sure the
    /// process is gone.
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.send("quit");
        }
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

/// Builds the `position` command for `board`.
pub fn position_command(board: &Board) -> String {
    let mut cmd = match board.start_fen() {
        Some(fen) => format!("position fen {}", fen),
        None => "position startpos".to_string(),
    };
    if !board.moves().is_empty() {
        cmd.push_str(" moves");
        for m in board.moves() {
            cmd.push(' ');
            cmd.push_str(&m.uci);
        }
    }
    cmd
}

/// Parses a `bestmove` line.
///
/// `bestmove e2e4 ponder e7e5` yields `e2e4`; `(none)` and `0000` yield
/// `None`.
pub fn parse_bestmove(line: &str) -> Result<Option<UciMove>, UciError> {
    let mut parts = line.split_whitespace();
    if parts.next() != Some("bestmove") {
        return Err(UciError::InvalidResponse(line.to_string()));
    }

    match parts.next() {
        None | Some("(none)") | Some("0000") => Ok(None),
        Some(text) => text
            .parse::<UciMove>()
            .map(Some)
            .map_err(|_| UciError::InvalidResponse(line.to_string())),
    }
}
