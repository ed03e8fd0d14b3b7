use thiserror::Error;

/// Errors raised loading a role's line-oriented config file (spec §6.4).
///
/// Config loading is explicitly out of scope as a subsystem (spec §1), so
/// this stays a thin wrapper: one variant for I/O, one for "not enough
/// lines", one for a line that doesn't parse as its expected type.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("couldn't read config file {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },

    #[error("config file {path} has {found} lines, expected at least {expected}")]
    TooShort { path: String, found: usize, expected: usize },

    #[error("config file {path} line {line}: invalid value {value:?}")]
    InvalidValue { path: String, line: usize, value: String },
}
