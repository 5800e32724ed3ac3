use serde::Deserialize;

use crate::error::IptResult;

/// How a manager invokes the iptables binary.
///
/// ```toml
/// ipv6 = false
/// table = "filter"
/// wait = true
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IptablesConfig {
  /// Use `ip6tables` instead of `iptables`.
  pub ipv6: bool,
  /// Passed as `-t <table>` when set; iptables defaults to `filter`.
  pub table: Option<String>,
  /// Wait for the xtables lock instead of failing when another process holds it.
  pub wait: bool,
}

impl IptablesConfig {
  pub fn from_toml(text: &str) -> IptResult<IptablesConfig> {
    Ok(toml::from_str(text)?)
  }

  pub fn program(&self) -> &'static str {
    if self.ipv6 { "ip6tables" } else { "iptables" }
  }
}
