use std::fmt;
use std::slice::Iter;

use ipnetwork::IpNetwork;
use string_builder::Builder;

pub const ACCEPT: &str = "ACCEPT";
pub const DROP: &str = "DROP";
pub const REJECT: &str = "REJECT";
pub const RETURN: &str = "RETURN";

/// Ordered iptables rule tokens, e.g. `-s 10.0.0.0/8 -p tcp --dport 443 -j ACCEPT`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuleSpec(Vec<String>);

impl RuleSpec {
  pub fn as_slice(&self) -> &[String] {
    &self.0
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> Iter<'_, String> {
    self.0.iter()
  }

  pub fn into_vec(self) -> Vec<String> {
    self.0
  }

  fn push<S: Into<String>>(&mut self, token: S) {
    self.0.push(token.into());
  }
}

impl<'a> IntoIterator for &'a RuleSpec {
  type Item = &'a String;
  type IntoIter = Iter<'a, String>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}

impl fmt::Display for RuleSpec {
  /// Renders the tokens as they would be typed on a shell, quoting tokens
  /// that contain whitespace or quotes.
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let mut builder = Builder::default();
    for (i, token) in self.0.iter().enumerate() {
      if i > 0 {
        builder.append(' ');
      }
      let quote = token.is_empty() || token.chars().any(|ch| ch.is_whitespace() || ch == '"');
      if !quote {
        builder.append(token.as_str());
        continue;
      }
      builder.append('"');
      for ch in token.chars() {
        if ch == '"' || ch == '\\' {
          builder.append('\\');
        }
        builder.append(ch);
      }
      builder.append('"');
    }
    let text = builder.string().map_err(|_| fmt::Error)?;
    f.write_str(&text)
  }
}

mod steps {
  /// Construction steps of a rule shape. Only reachable inside the crate, so
  /// a rule handed out by a factory function can no longer grow.
  ///
  /// Setters only ever append to the rule spec and run in the order source,
  /// destination, comment, action. A setter whose field is absent is a no-op,
  /// except `set_action`, which always emits `-j <action>`.
  pub trait RuleSteps {
    fn set_source(&mut self);
    fn set_destination(&mut self);
    fn set_comment(&mut self);
    fn set_action(&mut self);
  }
}

use self::steps::RuleSteps;

/// A finished rule: its match and target flags in emission order.
pub trait RuleBuilder: RuleSteps {
  fn spec(&self) -> &RuleSpec;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
  Tcp,
  Udp,
}

impl Protocol {
  pub fn as_str(&self) -> &'static str {
    match self {
      Protocol::Tcp => "tcp",
      Protocol::Udp => "udp",
    }
  }
}

impl fmt::Display for Protocol {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Source network plus destination port on a single protocol.
#[derive(Clone, Debug)]
pub struct SrcNetDestPortRule {
  src: Option<IpNetwork>,
  protocol: Protocol,
  port: String,
  comment: String,
  action: String,
  spec: RuleSpec,
}

impl SrcNetDestPortRule {
  fn build(src: Option<IpNetwork>, protocol: Protocol, port: &str, comment: &str, action: &str) -> SrcNetDestPortRule {
    let mut rule = SrcNetDestPortRule {
      src,
      protocol,
      port: port.to_string(),
      comment: comment.to_string(),
      action: action.to_string(),
      spec: RuleSpec::default(),
    };
    rule.set_source();
    rule.set_destination();
    rule.set_comment();
    rule.set_action();
    rule
  }

  pub fn protocol(&self) -> Protocol {
    self.protocol
  }
}

impl RuleSteps for SrcNetDestPortRule {
  fn set_source(&mut self) {
    if let Some(src) = self.src {
      self.spec.push("-s");
      self.spec.push(src.to_string());
    }
  }

  fn set_destination(&mut self) {
    if !self.port.is_empty() {
      self.spec.push("-p");
      self.spec.push(self.protocol.as_str());
      self.spec.push("--dport");
      self.spec.push(self.port.clone());
    }
  }

  fn set_comment(&mut self) {
    if !self.comment.is_empty() {
      self.spec.push("-m");
      self.spec.push("comment");
      self.spec.push("--comment");
      self.spec.push(self.comment.clone());
    }
  }

  fn set_action(&mut self) {
    self.spec.push("-j");
    self.spec.push(self.action.clone());
  }
}

impl RuleBuilder for SrcNetDestPortRule {
  fn spec(&self) -> &RuleSpec {
    &self.spec
  }
}

/// Builds `[-s <src>] [-p tcp --dport <port>] [-m comment --comment <comment>] -j <action>`.
pub fn new_src_net_dest_tcp_port_rule(src: Option<IpNetwork>, port: &str, comment: &str, action: &str) -> SrcNetDestPortRule {
  SrcNetDestPortRule::build(src, Protocol::Tcp, port, comment, action)
}

/// Same as [`new_src_net_dest_tcp_port_rule`] with `-p udp`.
pub fn new_src_net_dest_udp_port_rule(src: Option<IpNetwork>, port: &str, comment: &str, action: &str) -> SrcNetDestPortRule {
  SrcNetDestPortRule::build(src, Protocol::Udp, port, comment, action)
}
