//! Gao-Rexford route comparison.
//!
//! A candidate is either *processed* (already in the local RIB, with this AS
//! prepended and its receive relationship set) or *unprocessed* (as received
//! from a neighbor). Both kinds are normalised the same way before comparing:
//! an unprocessed candidate is compared with the relationship it would be
//! stored with, and its path counts one extra hop for the AS that has not
//! prepended itself yet. Only the winner ever needs to be processed.
//!
//! Each step returns `Some(true)` if the new candidate wins, `Some(false)` if
//! it loses and `None` if the step cannot decide.

use std::cmp::Ordering;

use crate::as_graphs::as_graph::ASN;
use crate::shared::Relationships;
use crate::simulation_engine::announcement::Announcement;

#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub ann: &'a Announcement,
    pub processed: bool,
    /// Used instead of the announcement's own relationship while unprocessed
    pub default_relationship: Relationships,
}

impl<'a> Candidate<'a> {
    pub fn processed(ann: &'a Announcement) -> Self {
        Candidate {
            ann,
            processed: true,
            default_relationship: ann.recv_relationship,
        }
    }

    pub fn unprocessed(ann: &'a Announcement, recv_relationship: Relationships) -> Self {
        Candidate {
            ann,
            processed: false,
            default_relationship: recv_relationship,
        }
    }

    pub fn relationship(&self) -> Relationships {
        if self.processed {
            self.ann.recv_relationship
        } else {
            self.default_relationship
        }
    }

    /// Hops already committed plus the one still pending
    pub fn path_len(&self) -> usize {
        self.ann.as_path.len() + usize::from(!self.processed)
    }

    /// The neighbor the route was learned from: index 1 once this AS has
    /// prepended itself, index 0 before. Seeded single-hop paths use index 0.
    pub fn tie_break_asn(&self) -> Option<ASN> {
        let len = self.ann.as_path.len();
        if len == 0 {
            return None;
        }
        let index = usize::from(self.processed).min(len - 1);
        self.ann.as_path.get(index).copied()
    }
}

pub fn new_rel_better(current: &Candidate<'_>, new: &Candidate<'_>) -> Option<bool> {
    match new.relationship().cmp(&current.relationship()) {
        Ordering::Greater => Some(true),
        Ordering::Less => Some(false),
        Ordering::Equal => None,
    }
}

pub fn new_as_path_shorter(current: &Candidate<'_>, new: &Candidate<'_>) -> Option<bool> {
    match new.path_len().cmp(&current.path_len()) {
        Ordering::Less => Some(true),
        Ordering::Greater => Some(false),
        Ordering::Equal => None,
    }
}

/// Lower neighbor ASN wins. `None` means the candidates are indistinguishable.
pub fn new_wins_ties(current: &Candidate<'_>, new: &Candidate<'_>) -> Option<bool> {
    match (current.tie_break_asn(), new.tie_break_asn()) {
        (Some(current_asn), Some(new_asn)) if current_asn != new_asn => Some(new_asn < current_asn),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation_engine::announcement::Prefix;

    fn unprocessed(path: Vec<ASN>) -> Announcement {
        let prefix: Prefix = "10.0.0.0/24".parse().unwrap();
        let mut ann =
            Announcement::seeded(prefix, *path.last().unwrap()).with_as_path(path.clone());
        ann.next_hop_asn = path[0];
        ann.seed_asn = None;
        ann
    }

    #[test]
    fn relationship_decides_first() {
        let customer = unprocessed(vec![9, 8, 7, 6]);
        let peer = unprocessed(vec![2, 6]);
        let current = Candidate::unprocessed(&peer, Relationships::Peers);
        let new = Candidate::unprocessed(&customer, Relationships::Customers);
        assert_eq!(new_rel_better(&current, &new), Some(true));
        assert_eq!(new_rel_better(&new, &current), Some(false));
    }

    #[test]
    fn processed_and_unprocessed_lengths_are_comparable() {
        let raw = unprocessed(vec![5, 6]);
        let stored = raw.copy_and_process(1, Relationships::Customers);
        let other = unprocessed(vec![4, 6]);

        let current = Candidate::processed(&stored);
        let new = Candidate::unprocessed(&other, Relationships::Customers);
        assert_eq!(current.path_len(), new.path_len());
        assert_eq!(new_as_path_shorter(&current, &new), None);
        // both compare the neighbor they were learned from: 5 vs 4
        assert_eq!(current.tie_break_asn(), Some(5));
        assert_eq!(new_wins_ties(&current, &new), Some(true));
    }

    #[test]
    fn identical_candidates_cannot_be_tie_broken() {
        let ann = unprocessed(vec![5, 6]);
        let a = Candidate::unprocessed(&ann, Relationships::Peers);
        let b = Candidate::unprocessed(&ann, Relationships::Peers);
        assert_eq!(new_wins_ties(&a, &b), None);
    }
}
