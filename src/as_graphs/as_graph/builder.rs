use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use log::{debug, info};

use super::{customer_cones, propagation_ranks, ASGraph, AS, ASN};
use crate::as_graphs::links::{ASGraphInfo, CustomerProviderLink, PeerLink};
use crate::shared::ConstructionError;

/// Mutable neighbor sets for one AS while the graph is being assembled
#[derive(Debug, Default)]
struct StagedAS {
    peers: HashSet<ASN>,
    providers: HashSet<ASN>,
    customers: HashSet<ASN>,
    input_clique: bool,
    ixp: bool,
}

/// Creates the node for an ASN at an arena index. The builder then fills in
/// the neighbor lists and every derived field, and keeps the `input_clique`
/// and `ixp` flags the factory set.
pub type ASFactory = fn(ASN, usize) -> AS;

/// Two-phase constructor for [`ASGraph`].
///
/// Links are collected into staging sets, then [`finish`](Self::finish)
/// validates them, freezes the neighbor lists and computes propagation ranks,
/// customer cones, AS rank and the AS groups.
#[derive(Debug)]
pub struct GraphBuilder {
    staged: BTreeMap<ASN, StagedAS>,
    customer_provider_links: Vec<CustomerProviderLink>,
    peer_links: Vec<PeerLink>,
    store_customer_cone_asns: bool,
    store_provider_cone_size: bool,
    store_provider_cone_asns: bool,
    as_factory: ASFactory,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        GraphBuilder {
            staged: BTreeMap::new(),
            customer_provider_links: Vec::new(),
            peer_links: Vec::new(),
            store_customer_cone_asns: false,
            store_provider_cone_size: false,
            store_provider_cone_asns: false,
            as_factory: AS::new,
        }
    }

    pub fn from_info(info: &ASGraphInfo) -> Self {
        let mut builder = Self::new();
        builder.add_info(info);
        builder
    }

    /// Keep the full customer cone of every AS, not only its size.
    pub fn store_customer_cone_asns(mut self, store: bool) -> Self {
        self.store_customer_cone_asns = store;
        self
    }

    pub fn store_provider_cone_size(mut self, store: bool) -> Self {
        self.store_provider_cone_size = store;
        self
    }

    pub fn store_provider_cone_asns(mut self, store: bool) -> Self {
        self.store_provider_cone_asns = store;
        self
    }

    pub fn with_as_factory(mut self, as_factory: ASFactory) -> Self {
        self.as_factory = as_factory;
        self
    }

    pub fn add_info(&mut self, info: &ASGraphInfo) -> &mut Self {
        // sorted so that error reporting does not depend on hash order
        let mut cp_links: Vec<_> = info.customer_provider_links.iter().copied().collect();
        cp_links.sort_by_key(|link| (link.customer_asn(), link.provider_asn()));
        for link in cp_links {
            self.add_customer_provider_link(link);
        }
        let mut peer_links: Vec<_> = info.peer_links.iter().copied().collect();
        peer_links.sort_by_key(|link| link.asns());
        for link in peer_links {
            self.add_peer_link(link);
        }
        for &asn in &info.ixp_asns {
            self.add_ixp_asn(asn);
        }
        for &asn in &info.input_clique_asns {
            self.add_input_clique_asn(asn);
        }
        self
    }

    pub fn add_customer_provider_link(&mut self, link: CustomerProviderLink) -> &mut Self {
        let (customer, provider) = (link.customer_asn(), link.provider_asn());
        self.staged.entry(customer).or_default().providers.insert(provider);
        self.staged.entry(provider).or_default().customers.insert(customer);
        self.customer_provider_links.push(link);
        self
    }

    pub fn add_peer_link(&mut self, link: PeerLink) -> &mut Self {
        let (asn1, asn2) = link.asns();
        self.staged.entry(asn1).or_default().peers.insert(asn2);
        self.staged.entry(asn2).or_default().peers.insert(asn1);
        self.peer_links.push(link);
        self
    }

    pub fn add_ixp_asn(&mut self, asn: ASN) -> &mut Self {
        self.staged.entry(asn).or_default().ixp = true;
        self
    }

    pub fn add_input_clique_asn(&mut self, asn: ASN) -> &mut Self {
        self.staged.entry(asn).or_default().input_clique = true;
        self
    }

    pub fn finish(self) -> Result<ASGraph, ConstructionError> {
        self.check_links()?;

        let index: HashMap<ASN, usize> = self
            .staged
            .keys()
            .enumerate()
            .map(|(i, &asn)| (asn, i))
            .collect();
        // staged ASNs are the only keys, so every lookup below resolves
        let freeze = |asns: &HashSet<ASN>| -> Vec<usize> {
            let mut indices: Vec<usize> = asns.iter().map(|asn| index[asn]).collect();
            indices.sort_unstable();
            indices
        };

        let mut ases = Vec::with_capacity(self.staged.len());
        let mut ixp_asns = BTreeSet::new();
        for (i, (&asn, staged)) in self.staged.iter().enumerate() {
            let made = (self.as_factory)(asn, i);
            let mut as_obj = AS::new(asn, i);
            as_obj.input_clique = staged.input_clique || made.input_clique;
            as_obj.ixp = staged.ixp || made.ixp;
            as_obj.peers = freeze(&staged.peers);
            as_obj.providers = freeze(&staged.providers);
            as_obj.customers = freeze(&staged.customers);
            if as_obj.ixp {
                ixp_asns.insert(asn);
            }
            ases.push(as_obj);
        }

        propagation_ranks::check_for_cycles(&ases)?;
        let propagation_ranks = propagation_ranks::assign_propagation_ranks(&mut ases);
        debug!("assigned {} propagation ranks", propagation_ranks.len());

        customer_cones::add_customer_cones(&mut ases, self.store_customer_cone_asns);
        customer_cones::add_as_rank(&mut ases);
        if self.store_provider_cone_size || self.store_provider_cone_asns {
            customer_cones::add_provider_cones(&mut ases, self.store_provider_cone_asns);
        }

        let mut as_graph = ASGraph {
            ases,
            index,
            ixp_asns,
            propagation_ranks,
            asn_groups: HashMap::new(),
        };
        as_graph.add_asn_groups();

        info!(
            "built AS graph: {} ASes, {} customer-provider links, {} peer links, {} ranks",
            as_graph.len(),
            self.customer_provider_links.len(),
            self.peer_links.len(),
            as_graph.propagation_ranks.len()
        );
        Ok(as_graph)
    }

    fn check_links(&self) -> Result<(), ConstructionError> {
        let mut cp_pairs: HashMap<(ASN, ASN), ASN> = HashMap::new();
        for link in &self.customer_provider_links {
            let (asn1, asn2) = link.asns();
            if asn1 == asn2 {
                return Err(ConstructionError::SelfLink { asn: asn1 });
            }
            match cp_pairs.get(&(asn1, asn2)) {
                // same pair, opposite direction
                Some(&provider) if provider != link.provider_asn() => {
                    return Err(ConstructionError::AmbiguousLink { asn1, asn2 });
                }
                _ => {
                    cp_pairs.insert((asn1, asn2), link.provider_asn());
                }
            }
        }
        for link in &self.peer_links {
            let (asn1, asn2) = link.asns();
            if asn1 == asn2 {
                return Err(ConstructionError::SelfLink { asn: asn1 });
            }
            if cp_pairs.contains_key(&(asn1, asn2)) {
                return Err(ConstructionError::AmbiguousLink { asn1, asn2 });
            }
        }
        Ok(())
    }
}
