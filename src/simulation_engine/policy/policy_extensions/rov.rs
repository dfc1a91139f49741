use crate::shared::Relationships;
use crate::simulation_engine::announcement::Announcement;
use crate::simulation_engine::policy::{bgp_valid_ann, PolicyContext, PolicyExtension};

/// Route Origin Validation (ROV) policy
///
/// Drops every announcement whose ROA validity is invalid. Unknown is
/// accepted.
#[derive(Debug, Clone)]
pub struct ROVPolicy;

impl PolicyExtension for ROVPolicy {
    fn name(&self) -> &str {
        "ROV"
    }

    fn valid_ann(
        &self,
        _ctx: &PolicyContext<'_>,
        ann: &Announcement,
        _recv_relationship: Relationships,
    ) -> bool {
        !ann.roa_validity.is_invalid() && bgp_valid_ann(ann)
    }
}
