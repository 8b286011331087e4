//! Premove Arena - premove-only matches between UCI chess engines.
//!
//! Both engines commit to a move before seeing the opponent's reply. A
//! premove that has become illegal by the time it is played is replaced by a
//! shallow fallback search; a side that cannot produce any legal move
//! resigns. The finished game is exported as PGN.
//!
//! # Modules
//!
//! - [`board`] - Live position, legality checks and game-over detection
//! - [`engine`] - The [`Engine`](engine::Engine) trait and the failure-absorbing move selector
//! - [`uci_client`] - UCI protocol client for engine subprocesses
//! - [`game_runner`] - The premove match loop
//! - [`config`] - TOML configuration
//! - [`pgn`] - PGN file generation

pub mod board;
pub mod config;
pub mod engine;
pub mod game_runner;
pub mod pgn;
pub mod uci_client;
