use std::path::PathBuf;

use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

/// Top-level error type for weft-editor-core operations
#[derive(Debug, Error, Diagnostic)]
pub enum WeftError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Card(#[from] CardError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

/// Card registration and construction errors.
///
/// These point at plugin setup mistakes, not at runtime data.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum CardError {
    #[error("{name}: card does not exist")]
    #[diagnostic(
        code(card::not_found),
        help("register the card with `CardModel::add` before creating it")
    )]
    NotFound { name: SmolStr },

    #[error("{name}: unsupported card type `{card_type}`, expected \"inline\" or \"block\"")]
    #[diagnostic(code(card::unsupported_type))]
    UnsupportedType { name: SmolStr, card_type: SmolStr },
}

/// Configuration loading errors
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config at {}", path.display())]
    #[diagnostic(code(config::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {message}")]
    #[diagnostic(code(config::parse))]
    Parse {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {var}: {value}")]
    #[diagnostic(code(config::env))]
    InvalidEnv { var: &'static str, value: String },
}
