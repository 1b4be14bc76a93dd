use crate::feature::detect::StatusSnapshot;
use crate::feature::{Feature, FeatureStatus};

pub const NONE: &str = "none";

/// First pending feature in declaration order. Priority is ignored.
pub fn next_feature<'a>(snapshot: &StatusSnapshot<'a>) -> Option<&'a Feature> {
  snapshot
    .states
    .iter()
    .find(|s| s.status == FeatureStatus::Pending)
    .map(|s| s.feature)
}
