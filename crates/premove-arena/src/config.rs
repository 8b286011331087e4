//! Match configuration.
//!
//! Settings come from a TOML file (`premove.toml` by default) and can be
//! overridden on the command line. Everything is fixed once the match starts.
//!
//! ```toml
//! output = "premove_sf_vs_lc0.pgn"
//! premove_depth = 6
//! fallback_depth = 1
//! max_moves = 200
//!
//! [white]
//! name = "Stockfish"
//! path = "/usr/bin/stockfish"
//!
//! [black]
//! name = "LCZero"
//! path = "/opt/lc0/lc0"
//!
//! [black.options]
//! WeightsFile = "/opt/lc0/net.pb.gz"
//! Threads = 2
//! ```

use crate::board::{side_name, Board, BoardError};
use serde::{Deserialize, Serialize};
use shakmaty::Color;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// No executable was configured for one of the sides.
    #[error("No engine path configured for {0}")]
    MissingEngine(&'static str),
    /// A setting is outside its allowed range.
    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    /// The configured starting position is not usable.
    #[error(transparent)]
    StartPosition(#[from] BoardError),
}

/// A UCI option value as written in the config file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Int(i) => write!(f, "{}", i),
            OptionValue::Text(s) => f.write_str(s),
        }
    }
}

/// Configuration for one side's engine.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct EngineConfig {
    /// Path to the engine executable.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Player name for the PGN. Defaults to the engine's own `id name`.
    #[serde(default)]
    pub name: Option<String>,
    /// UCI options sent with `setoption` before the game.
    #[serde(default)]
    pub options: BTreeMap<String, OptionValue>,
}

/// The parts of the configuration the match loop itself reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSettings {
    /// Depth of the search made before the opponent's reply is known.
    pub premove_depth: u32,
    /// Depth of the search made when a premove turns out illegal.
    pub fallback_depth: u32,
    /// Ceiling on the number of plies played.
    pub max_moves: usize,
    /// Query both engines for premoves at the same time.
    pub concurrent_premoves: bool,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            premove_depth: default_premove_depth(),
            fallback_depth: default_fallback_depth(),
            max_moves: default_max_moves(),
            concurrent_premoves: false,
        }
    }
}

/// Main match configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct MatchConfig {
    /// The engine playing white.
    #[serde(default)]
    pub white: EngineConfig,
    /// The engine playing black.
    #[serde(default)]
    pub black: EngineConfig,
    /// Where the PGN is written.
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_premove_depth")]
    pub premove_depth: u32,
    #[serde(default = "default_fallback_depth")]
    pub fallback_depth: u32,
    /// Ceiling on the number of plies (half-moves) played.
    #[serde(default = "default_max_moves")]
    pub max_moves: usize,
    #[serde(default)]
    pub concurrent_premoves: bool,
    /// Starting position as FEN. Defaults to the standard start.
    #[serde(default)]
    pub start_fen: Option<String>,
    /// PGN `Event` tag.
    #[serde(default = "default_event")]
    pub event: String,
    /// PGN `Site` tag.
    #[serde(default = "default_site")]
    pub site: String,
}

fn default_output() -> PathBuf {
    PathBuf::from("premove_match.pgn")
}

fn default_premove_depth() -> u32 {
    6
}

fn default_fallback_depth() -> u32 {
    1
}

fn default_max_moves() -> usize {
    200
}

fn default_event() -> String {
    "Premove Match".to_string()
}

fn default_site() -> String {
    "local".to_string()
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            white: EngineConfig::default(),
            black: EngineConfig::default(),
            output: default_output(),
            premove_depth: default_premove_depth(),
            fallback_depth: default_fallback_depth(),
            max_moves: default_max_moves(),
            concurrent_premoves: false,
            start_fen: None,
            event: default_event(),
            site: default_site(),
        }
    }
}

impl MatchConfig {
    /// Loads the match configuration.
    ///
    /// With an explicit `path` the file must exist. Without one, the file at
    /// [`Self::config_path()`] is read if present and the defaults are used
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file cannot be read, or
    /// [`ConfigError::ParseError`] if it contains invalid TOML.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = Self::config_path();
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(&config_path)?;
        let config = toml::from_str(&content)?;
        tracing::debug!("Loaded config from {}", config_path.display());
        Ok(config)
    }

    /// Returns the default path of the configuration file.
    pub fn config_path() -> PathBuf {
        PathBuf::from("premove.toml")
    }

    /// Returns the engine configuration for `color`.
    pub fn engine(&self, color: Color) -> &EngineConfig {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    /// Returns the executable path for `color`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEngine`] if none is configured.
    pub fn engine_path(&self, color: Color) -> Result<&Path, ConfigError> {
        self.engine(color)
            .path
            .as_deref()
            .ok_or(ConfigError::MissingEngine(side_name(color)))
    }

    /// Returns the settings the match loop runs with.
    pub fn settings(&self) -> MatchSettings {
        MatchSettings {
            premove_depth: self.premove_depth,
            fallback_depth: self.fallback_depth,
            max_moves: self.max_moves,
            concurrent_premoves: self.concurrent_premoves,
        }
    }

    /// Builds the starting board.
    pub fn board(&self) -> Result<Board, ConfigError> {
        match &self.start_fen {
            Some(fen) => Ok(Board::from_fen(fen)?),
            None => Ok(Board::new()),
        }
    }

    /// Checks that the configuration describes a playable match.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine_path(Color::White)?;
        self.engine_path(Color::Black)?;

        if self.premove_depth == 0 {
            return Err(ConfigError::Invalid {
                key: "premove_depth",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.fallback_depth == 0 {
            return Err(ConfigError::Invalid {
                key: "fallback_depth",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_moves == 0 {
            return Err(ConfigError::Invalid {
                key: "max_moves",
                reason: "must be at least 1".to_string(),
            });
        }

        self.board()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playable() -> MatchConfig {
        let mut config = MatchConfig::default();
        config.white.path = Some(PathBuf::from("/usr/bin/stockfish"));
        config.black.path = Some(PathBuf::from("/opt/lc0/lc0"));
        config
    }

    #[test]
    fn test_parse_valid_toml_config() {
        let toml_content = r#"
output = "sf_vs_lc0.pgn"
premove_depth = 8
fallback_depth = 2
max_moves = 120
concurrent_premoves = true

[white]
name = "Stockfish"
path = "/usr/bin/stockfish"

[white.options]
Threads = 4
Ponder = false

[black]
path = "/opt/lc0/lc0"

[black.options]
WeightsFile = "/opt/lc0/net.pb.gz"
"#;

        let config: MatchConfig = toml::from_str(toml_content).unwrap();

        assert_eq!(config.output, PathBuf::from("sf_vs_lc0.pgn"));
        assert_eq!(config.premove_depth, 8);
        assert_eq!(config.fallback_depth, 2);
        assert_eq!(config.max_moves, 120);
        assert!(config.concurrent_premoves);

        assert_eq!(config.white.name.as_deref(), Some("Stockfish"));
        assert_eq!(
            config.white.options.get("Threads"),
            Some(&OptionValue::Int(4))
        );
        assert_eq!(
            config.white.options.get("Ponder"),
            Some(&OptionValue::Bool(false))
        );

        assert!(config.black.name.is_none());
        assert_eq!(
            config.black.options["WeightsFile"].to_string(),
            "/opt/lc0/net.pb.gz"
        );
    }

    #[test]
    fn test_empty_config_defaults() {
        let config: MatchConfig = toml::from_str("").unwrap();

        assert_eq!(config.output, PathBuf::from("premove_match.pgn"));
        assert_eq!(config.premove_depth, 6);
        assert_eq!(config.fallback_depth, 1);
        assert_eq!(config.max_moves, 200);
        assert!(!config.concurrent_premoves);
        assert!(config.start_fen.is_none());
        assert_eq!(config.event, "Premove Match");
        assert_eq!(config.site, "local");
        assert_eq!(config.settings(), MatchSettings::default());
    }

    #[test]
    fn test_validate_requires_engine_paths() {
        let mut config = playable();
        config.black.path = None;

        match config.validate() {
            Err(ConfigError::MissingEngine(side)) => assert_eq!(side, "Black"),
            other => panic!("Expected MissingEngine, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_zero_depths() {
        let mut config = playable();
        config.fallback_depth = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                key: "fallback_depth",
                ..
            })
        ));

        let mut config = playable();
        config.premove_depth = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                key: "premove_depth",
                ..
            })
        ));

        let mut config = playable();
        config.max_moves = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_start_fen() {
        let mut config = playable();
        config.start_fen = Some("8/8/8 w".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::StartPosition(_))
        ));
    }

    #[test]
    fn test_validate_accepts_playable_config() {
        let mut config = playable();
        assert!(config.validate().is_ok());

        config.start_fen = Some("8/8/8/8/8/8/8/R3K2k w - - 0 1".to_string());
        assert!(config.validate().is_ok());
        assert_eq!(config.board().unwrap().start_fen(), config.start_fen.as_deref());
    }

    #[test]
    fn test_load_explicit_missing_file_is_an_error() {
        let result = MatchConfig::load(Some(Path::new("/nonexistent/premove.toml")));
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("match.toml");
        std::fs::write(&path, "max_moves = 40\n[white]\npath = \"engine\"\n").unwrap();

        let config = MatchConfig::load(Some(&path)).unwrap();
        assert_eq!(config.max_moves, 40);
        assert_eq!(config.engine_path(Color::White).unwrap(), Path::new("engine"));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "max_moves = \"lots\"").unwrap();

        assert!(matches!(
            MatchConfig::load(Some(&path)),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_config_path_returns_expected_path() {
        assert_eq!(MatchConfig::config_path(), PathBuf::from("premove.toml"));
    }

    #[test]
    fn test_engine_config_serialization_roundtrip() {
        let mut engine = EngineConfig {
            path: Some(PathBuf::from("/usr/bin/stockfish")),
            name: Some("SF".to_string()),
            options: BTreeMap::new(),
        };
        engine
            .options
            .insert("Hash".to_string(), OptionValue::Int(256));

        let serialized = toml::to_string(&engine).unwrap();
        let deserialized: EngineConfig = toml::from_str(&serialized).unwrap();

        assert_eq!(deserialized.path, engine.path);
        assert_eq!(deserialized.name, engine.name);
        assert_eq!(deserialized.options, engine.options);
    }
}
