mod builder;
mod customer_cones;
mod propagation_ranks;

pub use builder::{ASFactory, GraphBuilder};

use std::collections::{BTreeSet, HashMap};

use crate::shared::{ASNGroups, Relationships};

pub type ASN = u32;

/// One node of the AS graph.
///
/// Neighbor lists hold arena indices into the owning [`ASGraph`]. The arena is
/// ASN-sorted, so index order and ASN order agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AS {
    pub asn: ASN,
    pub index: usize,
    pub input_clique: bool,
    pub ixp: bool,
    pub peers: Vec<usize>,
    pub providers: Vec<usize>,
    pub customers: Vec<usize>,
    pub propagation_rank: u32,
    pub customer_cone_size: usize,
    pub customer_cone_asns: Option<BTreeSet<ASN>>,
    pub provider_cone_size: Option<usize>,
    pub provider_cone_asns: Option<BTreeSet<ASN>>,
    pub as_rank: usize,
}

impl AS {
    pub fn new(asn: ASN, index: usize) -> Self {
        AS {
            asn,
            index,
            input_clique: false,
            ixp: false,
            peers: Vec::new(),
            providers: Vec::new(),
            customers: Vec::new(),
            propagation_rank: 0,
            customer_cone_size: 0,
            customer_cone_asns: None,
            provider_cone_size: None,
            provider_cone_asns: None,
            as_rank: 0,
        }
    }

    pub fn neighbors(&self, rel: Relationships) -> &[usize] {
        match rel {
            Relationships::Providers => &self.providers,
            Relationships::Peers => &self.peers,
            Relationships::Customers => &self.customers,
            Relationships::Origin => &[],
        }
    }

    pub fn num_neighbors(&self) -> usize {
        self.peers.len() + self.providers.len() + self.customers.len()
    }

    /// Exactly one neighbor of any kind
    pub fn is_stub(&self) -> bool {
        self.num_neighbors() == 1
    }

    pub fn is_multihomed(&self) -> bool {
        self.customers.is_empty() && self.peers.len() + self.providers.len() > 1
    }

    pub fn is_transit(&self) -> bool {
        !self.customers.is_empty() && self.num_neighbors() > 1
    }
}

/// Immutable AS relationship graph, produced by [`GraphBuilder::finish`].
#[derive(Debug, Clone)]
pub struct ASGraph {
    ases: Vec<AS>,
    index: HashMap<ASN, usize>,
    ixp_asns: BTreeSet<ASN>,
    propagation_ranks: Vec<Vec<usize>>,
    asn_groups: HashMap<ASNGroups, BTreeSet<ASN>>,
}

impl ASGraph {
    pub fn get(&self, asn: ASN) -> Option<&AS> {
        self.index.get(&asn).map(|&i| &self.ases[i])
    }

    pub fn index_of(&self, asn: ASN) -> Option<usize> {
        self.index.get(&asn).copied()
    }

    /// Panics if `index` is out of range; indices come from this graph.
    pub fn by_index(&self, index: usize) -> &AS {
        &self.ases[index]
    }

    pub fn contains(&self, asn: ASN) -> bool {
        self.index.contains_key(&asn)
    }

    /// ASes in ascending ASN order
    pub fn iter(&self) -> impl Iterator<Item = &AS> {
        self.ases.iter()
    }

    pub fn asns(&self) -> impl Iterator<Item = ASN> + '_ {
        self.ases.iter().map(|as_obj| as_obj.asn)
    }

    pub fn len(&self) -> usize {
        self.ases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ases.is_empty()
    }

    /// Resolves a neighbor index list to AS records.
    pub fn resolve<'a>(&'a self, indices: &'a [usize]) -> impl Iterator<Item = &'a AS> + 'a {
        indices.iter().map(move |&i| &self.ases[i])
    }

    pub fn neighbors(&self, as_obj: &AS, rel: Relationships) -> impl Iterator<Item = &AS> + '_ {
        let indices = self.ases[as_obj.index].neighbors(rel);
        indices.iter().map(move |&i| &self.ases[i])
    }

    pub fn ixp_asns(&self) -> &BTreeSet<ASN> {
        &self.ixp_asns
    }

    /// Rank buckets from the leaves (rank 0) upward; each bucket is ASN-sorted.
    pub fn propagation_ranks(&self) -> &[Vec<usize>] {
        &self.propagation_ranks
    }

    /// Same as [`propagation_ranks`](Self::propagation_ranks) but as ASNs.
    pub fn propagation_rank_asns(&self) -> Vec<Vec<ASN>> {
        self.propagation_ranks
            .iter()
            .map(|rank| rank.iter().map(|&i| self.ases[i].asn).collect())
            .collect()
    }

    pub fn asn_group(&self, group: ASNGroups) -> &BTreeSet<ASN> {
        // every group is filled in by the builder
        &self.asn_groups[&group]
    }

    /// The relationship `neighbor` has from the point of view of `as_obj`.
    pub fn relationship(&self, as_obj: &AS, neighbor: ASN) -> Option<Relationships> {
        let neighbor_index = self.index_of(neighbor)?;
        [
            Relationships::Customers,
            Relationships::Peers,
            Relationships::Providers,
        ]
        .into_iter()
        .find(|rel| as_obj.neighbors(*rel).binary_search(&neighbor_index).is_ok())
    }

    fn add_asn_groups(&mut self) {
        let mut groups: HashMap<ASNGroups, BTreeSet<ASN>> = ASNGroups::ALL
            .iter()
            .map(|group| (*group, BTreeSet::new()))
            .collect();

        for as_obj in &self.ases {
            let mut member_of = Vec::new();
            if as_obj.ixp {
                member_of.push(ASNGroups::Ixp);
            } else {
                if as_obj.is_stub() {
                    member_of.push(ASNGroups::Stubs);
                }
                if as_obj.is_multihomed() {
                    member_of.push(ASNGroups::Multihomed);
                }
                if as_obj.is_stub() || as_obj.is_multihomed() {
                    member_of.push(ASNGroups::StubsOrMh);
                }
                if as_obj.input_clique {
                    member_of.push(ASNGroups::Input);
                }
                if as_obj.is_transit() {
                    member_of.push(ASNGroups::Transit);
                }
                if !(as_obj.is_stub() || as_obj.is_multihomed() || as_obj.input_clique) {
                    member_of.push(ASNGroups::Etc);
                }
                member_of.push(ASNGroups::AllWoutIxps);
            }

            for group in member_of {
                groups.entry(group).or_default().insert(as_obj.asn);
            }
        }
        self.asn_groups = groups;
    }
}
