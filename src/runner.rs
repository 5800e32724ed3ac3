use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use nix::fcntl::{Flock, FlockArg};

use crate::error::{IptError, IptResult};

/// Lock file used to serialize callers when the installed iptables has no `--wait`.
pub const LEGACY_LOCK_FILE: &str = "/var/run/xtables_old.lock";

/// Runs an external program synchronously.
///
/// Returns the combined output when the program exits with status zero,
/// `IptError::Exit` carrying the same output otherwise.
pub trait ProcessRunner {
  fn run(&self, program: &str, args: &[String]) -> IptResult<String>;
}

impl<'a, R: ProcessRunner + ?Sized> ProcessRunner for &'a R {
  fn run(&self, program: &str, args: &[String]) -> IptResult<String> {
    (**self).run(program, args)
  }
}

/// [`ProcessRunner`] backed by `std::process::Command`.
#[derive(Clone, Debug, Default)]
pub struct CommandRunner {
  lock_file: Option<PathBuf>,
}

impl CommandRunner {
  pub fn new() -> CommandRunner {
    CommandRunner { lock_file: None }
  }

  /// Holds an exclusive `flock` on `path` while each command runs.
  pub fn with_lock_file<P: Into<PathBuf>>(path: P) -> CommandRunner {
    CommandRunner { lock_file: Some(path.into()) }
  }

  pub fn lock_file(&self) -> Option<&PathBuf> {
    self.lock_file.as_ref()
  }

  fn lock(&self) -> IptResult<Option<Flock<File>>> {
    let path = match &self.lock_file {
      Some(path) => path,
      None => return Ok(None),
    };
    let file = File::create(path)?;
    tracing::trace!(path = %path.display(), "waiting for xtables lock");
    let lock = Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, errno)| IptError::Nix(errno))?;
    Ok(Some(lock))
  }
}

impl ProcessRunner for CommandRunner {
  fn run(&self, program: &str, args: &[String]) -> IptResult<String> {
    let _lock = self.lock()?;

    tracing::debug!(program, ?args, "exec");
    let spawn_err = |source| IptError::Spawn { program: program.to_string(), source };

    // stdout and stderr share one pipe so the output keeps the order it was written in.
    let (mut reader, writer) = io::pipe().map_err(spawn_err)?;
    let writer_err = writer.try_clone().map_err(spawn_err)?;
    let mut child = {
      let mut command = Command::new(program);
      command.args(args).stdin(Stdio::null()).stdout(writer).stderr(writer_err);
      // dropping `command` closes our copies of the write end
      command.spawn().map_err(spawn_err)?
    };

    let mut buf = vec![];
    reader.read_to_end(&mut buf)?;
    let status = child.wait()?;
    let combined = String::from_utf8_lossy(&buf).into_owned();

    if status.success() {
      return Ok(combined);
    }
    Err(IptError::Exit {
      program: program.to_string(),
      code: status.code(),
      output: combined,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn zero_exit_returns_combined_output() {
    let out = CommandRunner::new().run("sh", &args(&["-c", "echo out; echo err 1>&2"])).unwrap();
    assert_eq!(out, "out\nerr\n");
  }

  #[test]
  fn nonzero_exit_carries_output() {
    let err = CommandRunner::new().run("sh", &args(&["-c", "echo bad chain 1>&2; exit 2"])).unwrap_err();
    match err {
      IptError::Exit { code, output, .. } => {
        assert_eq!(code, Some(2));
        assert_eq!(output, "bad chain\n");
      }
      other => panic!("unexpected error: {:?}", other),
    }
  }

  #[test]
  fn missing_program_is_spawn_error() {
    let err = CommandRunner::new().run("iptbuilder-no-such-binary", &[]).unwrap_err();
    assert!(matches!(err, IptError::Spawn { .. }));
  }

  #[test]
  fn interleaved_streams_keep_write_order() {
    let out = CommandRunner::new().run("sh", &args(&["-c", "echo err1 1>&2; echo out1; echo err2 1>&2"])).unwrap();
    assert_eq!(out, "err1\nout1\nerr2\n");
  }

  #[test]
  fn lock_file_is_created() {
    let path = std::env::temp_dir().join(format!("iptbuilder-lock-{}", std::process::id()));
    let runner = CommandRunner::with_lock_file(&path);
    assert_eq!(runner.lock_file(), Some(&path));
    assert_eq!(runner.run("true", &[]).unwrap(), "");
    assert!(path.exists());
    let _ = std::fs::remove_file(&path);
  }

  #[test]
  fn lock_file_is_held_while_child_runs() {
    let path = std::env::temp_dir().join(format!("iptbuilder-held-{}", std::process::id()));
    let runner = CommandRunner::with_lock_file(&path);
    let lock_path = path.to_string_lossy().into_owned();
    match runner.run("flock", &args(&["-n", &lock_path, "true"])) {
      // util-linux flock not installed
      Err(IptError::Spawn { .. }) => {}
      Err(err) => assert!(err.is_exit_failure(), "unexpected error: {:?}", err),
      Ok(out) => panic!("lock was free while the child ran: {:?}", out),
    }
    let _ = std::fs::remove_file(&path);
  }
}
