use serde::{Deserialize, Serialize};

use crate::as_graphs::as_graph::ASN;
use crate::shared::{ROAValidity, Relationships};

pub type Prefix = ipnetwork::IpNetwork;

/// One route advertisement (or withdrawal) for one prefix.
///
/// `as_path[0]` is the AS that most recently added itself: the sender while
/// the announcement waits in a receive queue, the holder once it is in a
/// local RIB. The origin is last.
///
/// Equality covers every field, which is what the "already sent" check of
/// the Adj-RIB-Out relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Announcement {
    pub prefix: Prefix,
    #[serde(default)]
    pub as_path: Vec<ASN>,
    #[serde(default)]
    pub next_hop_asn: ASN,
    /// Only set on the seeding AS's own copy
    #[serde(default)]
    pub seed_asn: Option<ASN>,
    #[serde(default)]
    pub recv_relationship: Relationships,
    #[serde(default)]
    pub withdraw: bool,
    #[serde(default)]
    pub roa_validity: ROAValidity,
    /// RFC 9234 only-to-customers attribute
    #[serde(default)]
    pub only_to_customers: Option<ASN>,
}

impl Announcement {
    /// An announcement to be seeded at `seed_asn`.
    pub fn seeded(prefix: Prefix, seed_asn: ASN) -> Self {
        Announcement {
            prefix,
            as_path: Vec::new(),
            next_hop_asn: seed_asn,
            seed_asn: Some(seed_asn),
            recv_relationship: Relationships::Origin,
            withdraw: false,
            roa_validity: ROAValidity::Unknown,
            only_to_customers: None,
        }
    }

    /// Seeds with a pre-built path instead of just the seeding AS
    pub fn with_as_path(mut self, as_path: Vec<ASN>) -> Self {
        self.as_path = as_path;
        self
    }

    pub fn with_roa_validity(mut self, roa_validity: ROAValidity) -> Self {
        self.roa_validity = roa_validity;
        self
    }

    pub fn origin(&self) -> ASN {
        self.as_path.last().copied().unwrap_or(self.next_hop_asn)
    }

    /// The copy an AS stores after accepting this announcement.
    ///
    /// Prepends `asn`, records how it was received and drops the seed marker.
    /// `next_hop_asn` keeps pointing at the neighbor it came from.
    pub fn copy_and_process(&self, asn: ASN, recv_relationship: Relationships) -> Self {
        let mut as_path = Vec::with_capacity(self.as_path.len() + 1);
        as_path.push(asn);
        as_path.extend_from_slice(&self.as_path);
        Announcement {
            as_path,
            recv_relationship,
            seed_asn: None,
            ..self.clone()
        }
    }

    pub fn as_withdrawal(&self) -> Self {
        Announcement {
            withdraw: true,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_and_process_prepends_and_clears_seed() {
        let prefix: Prefix = "1.2.0.0/16".parse().unwrap();
        let ann = Announcement::seeded(prefix, 7).with_as_path(vec![7]);
        let processed = ann.copy_and_process(3, Relationships::Customers);

        assert_eq!(processed.as_path, vec![3, 7]);
        assert_eq!(processed.recv_relationship, Relationships::Customers);
        assert_eq!(processed.seed_asn, None);
        assert_eq!(processed.next_hop_asn, 7);
        assert_eq!(processed.origin(), 7);
    }

    #[test]
    fn withdrawal_differs_only_in_flag() {
        let prefix: Prefix = "1.2.0.0/16".parse().unwrap();
        let ann = Announcement::seeded(prefix, 7);
        let withdrawal = ann.as_withdrawal();
        assert!(withdrawal.withdraw);
        assert_ne!(withdrawal, ann);
        assert_eq!(Announcement { withdraw: false, ..withdrawal }, ann);
    }
}
