use string_builder::Builder;
use text_reader::TextReader;

use crate::command::IptablesCommandArgs;
use crate::error::{IptError, IptResult};
use crate::runner::ProcessRunner;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct IptablesVersion {
  pub major: u32,
  pub minor: u32,
  pub patch: u32,
}

impl IptablesVersion {
  pub fn new(major: u32, minor: u32, patch: u32) -> IptablesVersion {
    IptablesVersion { major, minor, patch }
  }

  /// Indicates if iptables has -C (--check) option
  pub fn has_check(&self) -> bool {
    *self > IptablesVersion::new(1, 4, 10)
  }

  /// Indicates if iptables has -w (--wait) option
  pub fn has_wait(&self) -> bool {
    *self > IptablesVersion::new(1, 4, 19)
  }
}

/// Runs `<program> --version` and parses the answer.
pub fn probe<R: ProcessRunner>(runner: &R, program: &str) -> IptResult<IptablesVersion> {
  let output = runner.run(program, &IptablesCommandArgs::new().version())?;
  let version = parse_version(&output)?;
  tracing::debug!(program, ?version, "detected iptables version");
  Ok(version)
}

/// Parses output like `iptables v1.8.7 (nf_tables)` into its version triple.
pub fn parse_version(text: &str) -> IptResult<IptablesVersion> {
  let mut reader = TextReader::new(text.to_string());

  let mut prev = ' ';
  while reader.has_next() {
    match reader.next() {
      Some('v') if prev == ' ' => break,
      Some(ch) => prev = ch,
      None => break,
    }
  }
  if !reader.has_next() {
    return Err(IptError::Version(text.to_string()));
  }

  let mut parts = vec![];
  let mut builder = Builder::default();
  while reader.has_next() {
    match reader.next() {
      Some(ch) if ch.is_ascii_digit() => {
        builder.append(ch);
      }
      Some('.') => {
        parts.push(builder.string()?);
        builder = Builder::default();
      }
      _ => break,
    }
  }
  parts.push(builder.string()?);

  if parts.len() != 3 || parts.iter().any(|part| part.is_empty()) {
    return Err(IptError::Version(text.to_string()));
  }
  Ok(IptablesVersion {
    major: parts[0].parse()?,
    minor: parts[1].parse()?,
    patch: parts[2].parse()?,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_nf_tables_banner() {
    let version = parse_version("iptables v1.8.7 (nf_tables)\n").unwrap();
    assert_eq!(version, IptablesVersion::new(1, 8, 7));
    assert!(version.has_check());
    assert!(version.has_wait());
  }

  #[test]
  fn parses_legacy_banner() {
    let version = parse_version("ip6tables v1.4.14").unwrap();
    assert_eq!(version, IptablesVersion::new(1, 4, 14));
    assert!(version.has_check());
    assert!(!version.has_wait());
  }

  #[test]
  fn capability_thresholds() {
    assert!(!IptablesVersion::new(1, 4, 10).has_check());
    assert!(IptablesVersion::new(1, 4, 11).has_check());
    assert!(!IptablesVersion::new(1, 4, 19).has_wait());
    assert!(IptablesVersion::new(1, 4, 20).has_wait());
    assert!(IptablesVersion::new(1, 6, 0).has_wait());
  }

  #[test]
  fn rejects_unexpected_output() {
    assert!(matches!(parse_version("command not found"), Err(IptError::Version(_))));
    assert!(matches!(parse_version("iptables v1.8"), Err(IptError::Version(_))));
    assert!(matches!(parse_version(""), Err(IptError::Version(_))));
  }
}
