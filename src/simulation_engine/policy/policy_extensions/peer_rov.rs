use crate::shared::Relationships;
use crate::simulation_engine::announcement::Announcement;
use crate::simulation_engine::policy::{bgp_valid_ann, PolicyContext, PolicyExtension};

/// ROV applied only to routes learned from peers
#[derive(Debug, Clone)]
pub struct PeerROVPolicy;

impl PolicyExtension for PeerROVPolicy {
    fn name(&self) -> &str {
        "PeerROV"
    }

    fn valid_ann(
        &self,
        _ctx: &PolicyContext<'_>,
        ann: &Announcement,
        recv_relationship: Relationships,
    ) -> bool {
        if recv_relationship == Relationships::Peers && ann.roa_validity.is_invalid() {
            return false;
        }
        bgp_valid_ann(ann)
    }
}
