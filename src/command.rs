use crate::rule::RuleSpec;

/// Builds the argument vector for each iptables operation.
///
/// Pure and stateless: chain names, positions and specs are passed through
/// without validation, iptables reports anything it doesn't like.
#[derive(Clone, Copy, Debug, Default)]
pub struct IptablesCommandArgs;

impl IptablesCommandArgs {
  pub fn new() -> IptablesCommandArgs {
    IptablesCommandArgs
  }

  /// `-L <chain> -n`
  pub fn check_chain_exist(&self, chain: &str) -> Vec<String> {
    vec!["-L".to_string(), chain.to_string(), "-n".to_string()]
  }

  /// `-C <chain> <spec...>`
  pub fn check_rule_exist(&self, chain: &str, spec: &RuleSpec) -> Vec<String> {
    self::with_spec(&["-C", chain], spec)
  }

  /// `-N <chain>`
  pub fn new_chain(&self, chain: &str) -> Vec<String> {
    vec!["-N".to_string(), chain.to_string()]
  }

  /// `-A <chain> <spec...>`
  pub fn append_rule(&self, chain: &str, spec: &RuleSpec) -> Vec<String> {
    self::with_spec(&["-A", chain], spec)
  }

  /// `-I <chain> <position> <spec...>`
  pub fn insert_rule(&self, chain: &str, position: u32, spec: &RuleSpec) -> Vec<String> {
    self::with_spec(&["-I", chain, &position.to_string()], spec)
  }

  /// `-R <chain> <position> <spec...>`
  pub fn replace_rule(&self, chain: &str, position: u32, spec: &RuleSpec) -> Vec<String> {
    self::with_spec(&["-R", chain, &position.to_string()], spec)
  }

  /// `-D <chain> <spec...>`
  pub fn delete_rule(&self, chain: &str, spec: &RuleSpec) -> Vec<String> {
    self::with_spec(&["-D", chain], spec)
  }

  /// `-D <chain> <position>`
  pub fn delete_rule_by_num(&self, chain: &str, position: u32) -> Vec<String> {
    vec!["-D".to_string(), chain.to_string(), position.to_string()]
  }

  /// `-F <chain>`
  pub fn flush_chain(&self, chain: &str) -> Vec<String> {
    vec!["-F".to_string(), chain.to_string()]
  }

  /// `-X <chain>`
  pub fn delete_chain(&self, chain: &str) -> Vec<String> {
    vec!["-X".to_string(), chain.to_string()]
  }

  /// `--version`
  pub fn version(&self) -> Vec<String> {
    vec!["--version".to_string()]
  }
}

fn with_spec(prefix: &[&str], spec: &RuleSpec) -> Vec<String> {
  let mut args = Vec::with_capacity(prefix.len() + spec.len());
  args.extend(prefix.iter().map(|item| item.to_string()));
  args.extend(spec.iter().cloned());
  args
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::rule::{self, RuleBuilder};

  fn spec() -> RuleSpec {
    let src = "10.0.0.0/8".parse().unwrap();
    rule::new_src_net_dest_tcp_port_rule(Some(src), "443", "", rule::ACCEPT).spec().clone()
  }

  fn prefixed(prefix: &[&str], spec: &RuleSpec) -> Vec<String> {
    prefix.iter().map(|s| s.to_string()).chain(spec.iter().cloned()).collect()
  }

  #[test]
  fn chain_commands() {
    let args = IptablesCommandArgs::new();
    assert_eq!(args.check_chain_exist("WHITELIST"), vec!["-L", "WHITELIST", "-n"]);
    assert_eq!(args.new_chain("WHITELIST"), vec!["-N", "WHITELIST"]);
    assert_eq!(args.flush_chain("WHITELIST"), vec!["-F", "WHITELIST"]);
    assert_eq!(args.delete_chain("WHITELIST"), vec!["-X", "WHITELIST"]);
  }

  #[test]
  fn append_preserves_spec_order() {
    let spec = spec();
    let args = IptablesCommandArgs::new().append_rule("INPUT", &spec);
    assert_eq!(args.len(), spec.len() + 2);
    assert_eq!(args, prefixed(&["-A", "INPUT"], &spec));
  }

  #[test]
  fn check_rule_reproduces_spec() {
    let spec = spec();
    let before = spec.clone();
    let args = IptablesCommandArgs::new().check_rule_exist("INPUT", &spec);
    assert_eq!(args, prefixed(&["-C", "INPUT"], &before));
    assert_eq!(spec, before);
  }

  #[test]
  fn positional_commands() {
    let spec = spec();
    let args = IptablesCommandArgs::new();
    assert_eq!(args.insert_rule("INPUT", 1, &spec), prefixed(&["-I", "INPUT", "1"], &spec));
    assert_eq!(args.replace_rule("INPUT", 1200, &spec), prefixed(&["-R", "INPUT", "1200"], &spec));
  }

  #[test]
  fn delete_commands() {
    let spec = spec();
    let args = IptablesCommandArgs::new();
    assert_eq!(args.delete_rule("INPUT", &spec), prefixed(&["-D", "INPUT"], &spec));
    assert_eq!(args.delete_rule_by_num("INPUT", 3), vec!["-D", "INPUT", "3"]);
  }

  #[test]
  fn empty_chain_is_passed_through() {
    assert_eq!(IptablesCommandArgs::new().new_chain(""), vec!["-N", ""]);
  }
}
