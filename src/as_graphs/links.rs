use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::as_graphs::as_graph::ASN;

/// Directed customer-provider edge.
///
/// Hashing and equality use the sorted endpoint pair, so a link and its
/// reversed twin collapse into a single set entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CustomerProviderLink {
    customer_asn: ASN,
    provider_asn: ASN,
}

impl CustomerProviderLink {
    pub fn new(customer_asn: ASN, provider_asn: ASN) -> Self {
        CustomerProviderLink {
            customer_asn,
            provider_asn,
        }
    }

    pub fn customer_asn(&self) -> ASN {
        self.customer_asn
    }

    pub fn provider_asn(&self) -> ASN {
        self.provider_asn
    }

    /// Endpoints in ascending order
    pub fn asns(&self) -> (ASN, ASN) {
        sorted_pair(self.customer_asn, self.provider_asn)
    }
}

impl PartialEq for CustomerProviderLink {
    fn eq(&self, other: &Self) -> bool {
        self.asns() == other.asns()
    }
}

impl Eq for CustomerProviderLink {}

impl Hash for CustomerProviderLink {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.asns().hash(state);
    }
}

/// Undirected peering edge, stored with its endpoints sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerLink {
    asn1: ASN,
    asn2: ASN,
}

impl PeerLink {
    pub fn new(asn1: ASN, asn2: ASN) -> Self {
        let (asn1, asn2) = sorted_pair(asn1, asn2);
        PeerLink { asn1, asn2 }
    }

    pub fn asns(&self) -> (ASN, ASN) {
        (self.asn1, self.asn2)
    }
}

fn sorted_pair(a: ASN, b: ASN) -> (ASN, ASN) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Everything needed to build an [`ASGraph`](crate::as_graphs::as_graph::ASGraph).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ASGraphInfo {
    pub customer_provider_links: HashSet<CustomerProviderLink>,
    pub peer_links: HashSet<PeerLink>,
    pub ixp_asns: HashSet<ASN>,
    pub input_clique_asns: HashSet<ASN>,
}

impl ASGraphInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_customer_provider(mut self, customer_asn: ASN, provider_asn: ASN) -> Self {
        self.customer_provider_links
            .insert(CustomerProviderLink::new(customer_asn, provider_asn));
        self
    }

    pub fn with_peers(mut self, asn1: ASN, asn2: ASN) -> Self {
        self.peer_links.insert(PeerLink::new(asn1, asn2));
        self
    }

    pub fn with_ixp(mut self, asn: ASN) -> Self {
        self.ixp_asns.insert(asn);
        self
    }

    pub fn with_input_clique(mut self, asn: ASN) -> Self {
        self.input_clique_asns.insert(asn);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_provider_link_hashes_on_sorted_pair() {
        let mut links = HashSet::new();
        links.insert(CustomerProviderLink::new(2, 1));
        links.insert(CustomerProviderLink::new(1, 2));
        assert_eq!(links.len(), 1);
        assert_eq!(CustomerProviderLink::new(9, 3).asns(), (3, 9));
    }

    #[test]
    fn peer_link_is_canonical() {
        assert_eq!(PeerLink::new(5, 4), PeerLink::new(4, 5));
        assert_eq!(PeerLink::new(5, 4).asns(), (4, 5));
    }
}
