use std::path::PathBuf;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

pub type Result<T, E = InfravizError> = std::result::Result<T, E>;

#[derive(Error, Debug, Diagnostic)]
#[error("Invalid TOML syntax in '{file}'")]
#[diagnostic(
    code(infraviz::toml_parse_error),
    help("Check the TOML syntax near the highlighted position")
)]
pub struct TomlParseError {
    pub file: String,
    #[source_code]
    pub source_code: NamedSource<String>,
    #[label("syntax error here")]
    pub span: Option<SourceSpan>,
    #[source]
    pub source: toml::de::Error,
}

#[derive(Error, Debug, Diagnostic)]
pub enum InfravizError {
    #[error("Invalid input: {message}")]
    #[diagnostic(
        code(infraviz::validation_error),
        help("The entity records handed to the engine are structurally malformed")
    )]
    Validation { message: String },

    #[error("Size limit exceeded: {actual} {what} (limit is {limit})")]
    #[diagnostic(
        code(infraviz::size_limit),
        help("Split the graph or raise `limits.max_nodes` / `limits.max_edges`")
    )]
    SizeLimit {
        what: &'static str,
        actual: usize,
        limit: usize,
    },

    #[error("Found {count} dependency cycle(s): {cycles}")]
    #[diagnostic(
        code(infraviz::cycle),
        help("Break the cycle or disable `validation.strict` to render it as an error graph")
    )]
    Cycle { cycles: String, count: usize },

    #[error("Build deadline exceeded during {stage} ({elapsed_ms}ms > {budget_ms}ms)")]
    #[diagnostic(
        code(infraviz::timeout),
        help("Raise `limits.build_timeout_ms` or reduce layout iterations")
    )]
    Timeout {
        stage: &'static str,
        elapsed_ms: u128,
        budget_ms: u128,
    },

    #[error("No {what} with id '{id}' in the snapshot")]
    #[diagnostic(
        code(infraviz::not_found),
        help("Check the --id value against the ids listed in the snapshot file")
    )]
    NotFound { what: &'static str, id: String },

    #[error("Failed to read file '{path}'")]
    #[diagnostic(
        code(infraviz::io_error),
        help("Check if the file exists and you have read permissions")
    )]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    TomlParseError(Box<TomlParseError>),

    #[error("JSON serialization error")]
    #[diagnostic(
        code(infraviz::json_error),
        help("Check that the snapshot matches the expected record shape")
    )]
    Json(#[from] serde_json::Error),

    #[error("String formatting error")]
    #[diagnostic(
        code(infraviz::fmt_error),
        help("This is likely an internal error - please report it")
    )]
    Fmt(#[from] std::fmt::Error),

    #[error("IO error")]
    #[diagnostic(
        code(infraviz::io_error),
        help("Check file permissions and disk space")
    )]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(infraviz::config_error),
        help("Check your command arguments and configuration")
    )]
    ConfigurationError { message: String },
}

impl InfravizError {
    /// Structural, size and deadline failures abort a build; everything else
    /// is either a caller mistake or an I/O problem outside the engine.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            InfravizError::Validation { .. }
                | InfravizError::SizeLimit { .. }
                | InfravizError::Timeout { .. }
                | InfravizError::Cycle { .. }
        )
    }
}
