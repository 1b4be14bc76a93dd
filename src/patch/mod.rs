pub mod apply;
pub mod templates;

use crate::error::{AgentError, Result};

const BANNER_RULE: &str =
  "// ============================================================================";

/// Source text for one feature plus the marker proving it was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchBlock {
  pub feature: &'static str,
  pub marker: &'static str,
  body: &'static str,
}

impl PatchBlock {
  /// Banner carrying the marker, followed by the body.
  pub fn text(&self) -> String {
    format!(
      "\n{BANNER_RULE}\n// {marker}\n{BANNER_RULE}\n{body}",
      marker = self.marker,
      body = self.body,
    )
  }

  pub fn is_applied_in(&self, content: &str) -> bool {
    content.contains(self.marker)
  }
}

/// (feature, marker, body) for every feature that has a template.
const BLOCKS: &[(&str, &str, &str)] = &[
  (
    "p2p-peer-discovery",
    templates::P2P_PEER_DISCOVERY_MARKER,
    templates::P2P_PEER_DISCOVERY,
  ),
  (
    "tor-integration",
    templates::TOR_INTEGRATION_MARKER,
    templates::TOR_INTEGRATION,
  ),
  (
    "qr-code-implementation",
    templates::QR_CODE_MARKER,
    templates::QR_CODE,
  ),
];

/// Deterministic: the same feature name always yields the same block.
pub fn synthesize(feature: &str) -> Result<PatchBlock> {
  BLOCKS
    .iter()
    .find(|(name, _, _)| *name == feature)
    .map(|&(feature, marker, body)| PatchBlock {
      feature,
      marker,
      body,
    })
    .ok_or_else(|| AgentError::UnknownFeature(feature.to_string()))
}
