//! Builds iptables argument vectors and runs them against the `iptables` binary.
//!
//! ```rust,ignore
//! use iptbuilder::rule;
//!
//! let manager = iptbuilder::IptablesManager::new();
//! let src = "10.0.0.0/8".parse().unwrap();
//! let rule = rule::new_src_net_dest_tcp_port_rule(Some(src), "443", "https", rule::ACCEPT);
//! if !manager.rule_exist("INPUT", &rule) {
//!   manager.append_rule("INPUT", &rule)?;
//! }
//! ```

use crate::config::IptablesConfig;
use crate::error::IptResult;
use crate::runner::{CommandRunner, LEGACY_LOCK_FILE};
use crate::version::IptablesVersion;

pub mod command;
pub mod config;
pub mod error;
pub mod manager;
pub mod rule;
pub mod runner;
pub mod version;

pub use command::IptablesCommandArgs;
pub use error::IptError;
pub use manager::IptablesManager;
pub use rule::{RuleBuilder, RuleSpec};
pub use runner::ProcessRunner;

/// Creates a manager for `config`, probing the installed binary first.
///
/// See [`from_version`] for how the probed version shapes the manager.
pub fn new(config: &IptablesConfig) -> IptResult<IptablesManager<CommandRunner>> {
  let version = version::probe(&CommandRunner::new(), config.program())?;
  Ok(from_version(config, &version))
}

/// Creates a manager for `config` and an already known binary `version`.
///
/// When `config.wait` is set, versions that know `--wait` get it on every
/// command, older ones are serialized through an exclusive lock on
/// [`LEGACY_LOCK_FILE`]. Versions without `-C` get a manager whose rule
/// checks report `IptError::Unsupported`.
pub fn from_version(config: &IptablesConfig, version: &IptablesVersion) -> IptablesManager<CommandRunner> {
  let program = config.program();
  let mut manager = if !config.wait {
    IptablesManager::with_runner(CommandRunner::new())
  } else if version.has_wait() {
    IptablesManager::with_runner(CommandRunner::new()).wait()
  } else {
    tracing::debug!(program, lock = LEGACY_LOCK_FILE, "no --wait support, using lock file");
    IptablesManager::with_runner(CommandRunner::with_lock_file(LEGACY_LOCK_FILE))
  };
  if !version.has_check() {
    tracing::warn!(program, ?version, "no -C support, rule checks are unavailable");
    manager = manager.without_check();
  }
  manager = manager.program(program);
  if let Some(table) = &config.table {
    manager = manager.table(table.as_str());
  }
  manager
}
