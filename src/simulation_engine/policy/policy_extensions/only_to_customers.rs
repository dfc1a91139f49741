use crate::as_graphs::as_graph::AS;
use crate::shared::Relationships;
use crate::simulation_engine::announcement::Announcement;
use crate::simulation_engine::policy::{
    bgp_valid_ann, gao_rexford_should_propagate, PolicyContext, PolicyExtension,
};

/// Only to Customers (OTC) policy, RFC 9234
///
/// Marks routes sent to customers and peers with this AS's ASN, never sends a
/// marked route up or sideways, and treats a marked route arriving from a
/// customer, or from a peer other than the one that marked it, as a leak.
#[derive(Debug, Clone)]
pub struct OnlyToCustomersPolicy;

impl PolicyExtension for OnlyToCustomersPolicy {
    fn name(&self) -> &str {
        "OnlyToCustomers"
    }

    fn valid_ann(
        &self,
        _ctx: &PolicyContext<'_>,
        ann: &Announcement,
        recv_relationship: Relationships,
    ) -> bool {
        match (ann.only_to_customers, recv_relationship) {
            (Some(_), Relationships::Customers) => false,
            (Some(marker), Relationships::Peers) if ann.as_path.first() != Some(&marker) => false,
            _ => bgp_valid_ann(ann),
        }
    }

    fn should_propagate(
        &self,
        _ctx: &PolicyContext<'_>,
        ann: &Announcement,
        send_relationship: Relationships,
    ) -> bool {
        if ann.only_to_customers.is_some() && send_relationship != Relationships::Customers {
            return false;
        }
        gao_rexford_should_propagate(ann, send_relationship)
    }

    fn process_outgoing_ann(
        &self,
        ctx: &PolicyContext<'_>,
        mut ann: Announcement,
        _neighbor: &AS,
        send_relationship: Relationships,
    ) -> Option<Announcement> {
        if matches!(send_relationship, Relationships::Customers | Relationships::Peers)
            && ann.only_to_customers.is_none()
        {
            ann.only_to_customers = Some(ctx.as_obj.asn);
        }
        Some(ann)
    }
}
