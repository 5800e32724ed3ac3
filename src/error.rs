use std::{io, num};
use std::string::FromUtf8Error;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IptError {
  /// The program could not be started at all (missing binary, no permission to exec).
  #[error("failed to run {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  /// The program ran and exited non-zero, or was killed by a signal (`code` is `None`).
  #[error("{program} exited with {}: {output}", describe_code(.code))]
  Exit {
    program: String,
    code: Option<i32>,
    output: String,
  },

  #[error(transparent)]
  Io(#[from] io::Error),

  #[error(transparent)]
  Nix(#[from] nix::Error),

  #[error(transparent)]
  Parse(#[from] num::ParseIntError),

  #[error(transparent)]
  Utf8(#[from] FromUtf8Error),

  #[error(transparent)]
  Config(#[from] toml::de::Error),

  #[error("unexpected version output: {0}")]
  Version(String),

  /// The installed binary predates an option the operation needs.
  #[error("{program} does not support {option}")]
  Unsupported {
    program: String,
    option: &'static str,
  },
}

fn describe_code(code: &Option<i32>) -> String {
  match code {
    Some(code) => format!("status {}", code),
    None => "signal".to_string(),
  }
}

/// Defines the Result type of iptbuilder crate
pub type IptResult<T> = Result<T, IptError>;

impl IptError {
  /// Captured combined output of a failed invocation.
  pub fn output(&self) -> Option<&str> {
    match self {
      IptError::Exit { output, .. } => Some(output),
      _ => None,
    }
  }

  /// `true` when the program ran but did not exit with status zero.
  pub fn is_exit_failure(&self) -> bool {
    matches!(self, IptError::Exit { .. })
  }
}
