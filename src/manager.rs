use crate::command::IptablesCommandArgs;
use crate::error::{IptError, IptResult};
use crate::rule::RuleBuilder;
use crate::runner::{CommandRunner, ProcessRunner};

/// Runs iptables commands built by [`IptablesCommandArgs`].
///
/// Every call builds a fresh argument vector and blocks until the process
/// exits. Nothing is coordinated between callers: checking before appending
/// is up to the caller, and concurrent writers rely on iptables' own locking.
pub struct IptablesManager<R = CommandRunner> {
  args: IptablesCommandArgs,
  runner: R,
  program: String,
  prefix: Vec<String>,
  has_check: bool,
}

impl IptablesManager<CommandRunner> {
  /// Plain `iptables` with no table or wait options.
  pub fn new() -> IptablesManager<CommandRunner> {
    IptablesManager::with_runner(CommandRunner::new())
  }
}

impl Default for IptablesManager<CommandRunner> {
  fn default() -> Self {
    IptablesManager::new()
  }
}

impl<R: ProcessRunner> IptablesManager<R> {
  pub fn with_runner(runner: R) -> IptablesManager<R> {
    IptablesManager {
      args: IptablesCommandArgs::new(),
      runner,
      program: "iptables".to_string(),
      prefix: vec![],
      has_check: true,
    }
  }

  /// Binary to execute, `iptables` unless changed.
  pub fn program<S: Into<String>>(mut self, program: S) -> IptablesManager<R> {
    self.program = program.into();
    self
  }

  /// Adds `-t <table>` in front of every command.
  pub fn table<S: Into<String>>(mut self, table: S) -> IptablesManager<R> {
    self.prefix.push("-t".to_string());
    self.prefix.push(table.into());
    self
  }

  /// Adds `--wait` in front of every command.
  pub fn wait(mut self) -> IptablesManager<R> {
    self.prefix.push("--wait".to_string());
    self
  }

  /// Marks the binary as lacking `-C` (iptables 1.4.10 and older).
  /// Rule checks then fail with `IptError::Unsupported` instead of reading as "absent".
  pub fn without_check(mut self) -> IptablesManager<R> {
    self.has_check = false;
    self
  }

  pub fn program_name(&self) -> &str {
    &self.program
  }

  /// Options put in front of every command, e.g. `--wait -t nat`.
  pub fn prefix(&self) -> &[String] {
    &self.prefix
  }

  pub fn has_check(&self) -> bool {
    self.has_check
  }

  pub fn runner(&self) -> &R {
    &self.runner
  }

  fn run(&self, args: Vec<String>) -> IptResult<String> {
    let argv = if self.prefix.is_empty() {
      args
    } else {
      self.prefix.iter().cloned().chain(args).collect()
    };
    self.runner.run(&self.program, &argv)
  }

  fn modify(&self, args: Vec<String>) -> IptResult<String> {
    self.run(args).map_err(|err| {
      tracing::warn!(program = %self.program, output = err.output().unwrap_or_default(), "{}", err);
      err
    })
  }

  fn exists(&self, args: Vec<String>) -> IptResult<bool> {
    match self.run(args) {
      Ok(_) => Ok(true),
      Err(IptError::Exit { .. }) => Ok(false),
      Err(err) => Err(err),
    }
  }

  /// `true` iff `-L <chain> -n` exits zero. Any failure, including a missing
  /// binary, reads as "does not exist"; see [`check_chain_exist`](Self::check_chain_exist).
  pub fn chain_exist(&self, chain: &str) -> bool {
    self.run(self.args.check_chain_exist(chain)).is_ok()
  }

  /// `true` iff `-C <chain> <spec...>` exits zero. Any failure reads as "does not exist".
  pub fn rule_exist<B: RuleBuilder + ?Sized>(&self, chain: &str, rule: &B) -> bool {
    self.has_check && self.run(self.args.check_rule_exist(chain, rule.spec())).is_ok()
  }

  /// Like [`chain_exist`](Self::chain_exist), but a program that could not be
  /// started is an error rather than `false`.
  pub fn check_chain_exist(&self, chain: &str) -> IptResult<bool> {
    self.exists(self.args.check_chain_exist(chain))
  }

  /// Like [`rule_exist`](Self::rule_exist), but a program that could not be
  /// started, or one without `-C`, is an error rather than `false`.
  pub fn check_rule_exist<B: RuleBuilder + ?Sized>(&self, chain: &str, rule: &B) -> IptResult<bool> {
    if !self.has_check {
      return Err(IptError::Unsupported { program: self.program.clone(), option: "-C" });
    }
    self.exists(self.args.check_rule_exist(chain, rule.spec()))
  }

  /// Creates the user-defined `chain` (`-N`).
  /// Returns the captured output, or `IptError::Exit` carrying it when iptables fails.
  pub fn new_chain(&self, chain: &str) -> IptResult<String> {
    self.modify(self.args.new_chain(chain))
  }

  /// Appends `rule` to the end of `chain` (`-A`).
  /// Returns the captured output, or `IptError::Exit` carrying it when iptables fails.
  pub fn append_rule<B: RuleBuilder + ?Sized>(&self, chain: &str, rule: &B) -> IptResult<String> {
    self.modify(self.args.append_rule(chain, rule.spec()))
  }

  /// Inserts `rule` at 1-based `position` in `chain` (`-I`).
  /// Returns the captured output, or `IptError::Exit` carrying it when iptables fails.
  pub fn insert_rule<B: RuleBuilder + ?Sized>(&self, chain: &str, position: u32, rule: &B) -> IptResult<String> {
    self.modify(self.args.insert_rule(chain, position, rule.spec()))
  }

  /// Replaces the rule at 1-based `position` in `chain` with `rule` (`-R`).
  /// Returns the captured output, or `IptError::Exit` carrying it when iptables fails.
  pub fn replace_rule<B: RuleBuilder + ?Sized>(&self, chain: &str, position: u32, rule: &B) -> IptResult<String> {
    self.modify(self.args.replace_rule(chain, position, rule.spec()))
  }

  /// Deletes the first rule in `chain` matching `rule` (`-D`).
  /// Returns the captured output, or `IptError::Exit` carrying it when no rule matched.
  pub fn delete_rule<B: RuleBuilder + ?Sized>(&self, chain: &str, rule: &B) -> IptResult<String> {
    self.modify(self.args.delete_rule(chain, rule.spec()))
  }

  /// Deletes the rule at 1-based `position` in `chain` (`-D`).
  /// Returns the captured output, or `IptError::Exit` carrying it when the position is out of range.
  pub fn delete_rule_by_num(&self, chain: &str, position: u32) -> IptResult<String> {
    self.modify(self.args.delete_rule_by_num(chain, position))
  }

  /// Removes every rule from `chain` (`-F`).
  /// Returns the captured output, or `IptError::Exit` carrying it when iptables fails.
  pub fn flush_chain(&self, chain: &str) -> IptResult<String> {
    self.modify(self.args.flush_chain(chain))
  }

  /// Deletes the empty user-defined `chain` (`-X`).
  /// Returns the captured output, or `IptError::Exit` carrying it when iptables fails.
  pub fn delete_chain(&self, chain: &str) -> IptResult<String> {
    self.modify(self.args.delete_chain(chain))
  }

  /// Appends `rule` unless `-C` already finds it.
  /// Returns `true` if the rule was appended.
  pub fn append_rule_unique<B: RuleBuilder + ?Sized>(&self, chain: &str, rule: &B) -> IptResult<bool> {
    if self.check_rule_exist(chain, rule)? {
      return Ok(false);
    }
    self.append_rule(chain, rule)?;
    Ok(true)
  }

  /// Inserts `rule` at `position` unless `-C` already finds it.
  /// Returns `true` if the rule was inserted.
  pub fn insert_rule_unique<B: RuleBuilder + ?Sized>(&self, chain: &str, position: u32, rule: &B) -> IptResult<bool> {
    if self.check_rule_exist(chain, rule)? {
      return Ok(false);
    }
    self.insert_rule(chain, position, rule)?;
    Ok(true)
  }
}
