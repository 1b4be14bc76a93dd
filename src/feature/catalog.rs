use std::collections::HashSet;

use crate::error::{AgentError, Result};
use crate::feature::{DetectionRule, Feature, Predicate, Priority};

/// Read-only feature catalog. Declaration order is selection order.
#[derive(Debug, Clone)]
pub struct Registry {
  features: Vec<Feature>,
}

impl Registry {
  pub fn new(features: Vec<Feature>) -> Result<Self> {
    if features.is_empty() {
      return Err(AgentError::Config("feature catalog is empty".into()));
    }
    let mut seen = HashSet::new();
    for feature in &features {
      if !seen.insert(feature.name) {
        return Err(AgentError::Config(format!(
          "duplicate feature in catalog: {}",
          feature.name
        )));
      }
    }
    Ok(Self { features })
  }

  /// The Brezn MVP catalog.
  pub fn builtin() -> Result<Self> {
    Self::new(vec![
      p2p_peer_discovery(),
      tor_integration(),
      qr_code_implementation(),
    ])
  }

  pub fn features(&self) -> &[Feature] {
    &self.features
  }

  pub fn len(&self) -> usize {
    self.features.len()
  }
}

fn p2p_peer_discovery() -> Feature {
  Feature {
    name: "p2p-peer-discovery",
    priority: Priority::High,
    files: vec!["network.rs", "discovery.rs"],
    description: "UDP broadcast peer discovery with heartbeat system",
    detection: DetectionRule {
      file: "network.rs",
      predicates: vec![
        Predicate::AllOf(vec![
          Predicate::Contains("UdpSocket"),
          Predicate::ContainsIgnoreCase("broadcast"),
        ]),
        Predicate::Contains("peer_registry"),
        Predicate::all(&["heartbeat", "ping", "pong"]),
      ],
    },
    target: "network.rs",
  }
}

fn tor_integration() -> Feature {
  Feature {
    name: "tor-integration",
    priority: Priority::Medium,
    files: vec!["tor.rs", "network.rs"],
    description: "SOCKS5 proxy integration for anonymous communication",
    detection: DetectionRule {
      file: "tor.rs",
      predicates: vec![
        Predicate::ContainsIgnoreCase("socks5"),
        Predicate::any(&["tor_routing", "circuit"]),
        Predicate::all(&["proxy", "integration"]),
      ],
    },
    target: "tor.rs",
  }
}

fn qr_code_implementation() -> Feature {
  Feature {
    name: "qr-code-implementation",
    priority: Priority::Low,
    files: vec!["discovery.rs", "types.rs"],
    description: "QR code generation and parsing for peer joining",
    detection: DetectionRule {
      file: "discovery.rs",
      predicates: vec![
        Predicate::all(&["qr_code", "generate"]),
        Predicate::all(&["qr_code", "parse"]),
        Predicate::any(&["peer_join", "join_network"]),
      ],
    },
    target: "discovery.rs",
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_builtin_declaration_order() {
    let registry = Registry::builtin().unwrap();
    let names: Vec<_> = registry.features().iter().map(|f| f.name).collect();
    assert_eq!(
      names,
      vec!["p2p-peer-discovery", "tor-integration", "qr-code-implementation"]
    );
  }

  #[test]
  fn test_builtin_targets_are_detection_files() {
    for feature in Registry::builtin().unwrap().features() {
      assert_eq!(feature.target, feature.detection.file);
      assert!(feature.files.contains(&feature.target));
    }
  }

  #[test]
  fn test_empty_catalog_rejected() {
    assert!(matches!(Registry::new(vec![]), Err(AgentError::Config(_))));
  }

  #[test]
  fn test_duplicate_names_rejected() {
    let err = Registry::new(vec![tor_integration(), tor_integration()]).unwrap_err();
    assert!(err.to_string().contains("tor-integration"));
  }
}
