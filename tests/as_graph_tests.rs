use std::collections::{BTreeSet, HashSet};
use std::fs;

use maplit::btreeset;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use bgpsimulator::as_graphs::as_graph_generators::CAIDAASGraphReader;
use bgpsimulator::{
    ASGraph, ASGraphInfo, ASNGroups, ConstructionError, CustomerProviderLink, GraphBuilder,
    Relationships, AS, ASN,
};

/// 1 is the tier-1 provider of 2 and 3, 2 is the provider of 4
fn create_test_as_graph_simple() -> ASGraph {
    let info = ASGraphInfo::new()
        .with_customer_provider(2, 1)
        .with_customer_provider(3, 1)
        .with_customer_provider(4, 2)
        .with_input_clique(1);
    GraphBuilder::from_info(&info).finish().unwrap()
}

#[test]
fn test_neighbors_are_resolved() {
    let as_graph = create_test_as_graph_simple();
    assert_eq!(as_graph.len(), 4);
    assert_eq!(as_graph.asns().collect::<Vec<_>>(), vec![1, 2, 3, 4]);

    let as2 = as_graph.get(2).unwrap();
    let providers: Vec<_> = as_graph
        .neighbors(as2, Relationships::Providers)
        .map(|a| a.asn)
        .collect();
    let customers: Vec<_> = as_graph
        .neighbors(as2, Relationships::Customers)
        .map(|a| a.asn)
        .collect();
    assert_eq!(providers, vec![1]);
    assert_eq!(customers, vec![4]);
    assert!(as2.peers.is_empty());

    assert_eq!(as_graph.relationship(as2, 1), Some(Relationships::Providers));
    assert_eq!(as_graph.relationship(as2, 4), Some(Relationships::Customers));
    assert_eq!(as_graph.relationship(as2, 3), None);
    assert!(as_graph.get(99).is_none());
}

#[test]
fn test_neighbor_lists_follow_asn_order() {
    let info = ASGraphInfo::new()
        .with_customer_provider(30, 1)
        .with_customer_provider(10, 1)
        .with_customer_provider(20, 1);
    let as_graph = GraphBuilder::from_info(&info).finish().unwrap();

    let as1 = as_graph.get(1).unwrap();
    let customers: Vec<_> = as_graph.resolve(&as1.customers).map(|a| a.asn).collect();
    assert_eq!(customers, vec![10, 20, 30]);
}

#[test]
fn test_propagation_ranks() {
    let as_graph = create_test_as_graph_simple();
    assert_eq!(as_graph.propagation_rank_asns(), vec![vec![3, 4], vec![2], vec![1]]);
    assert_eq!(as_graph.get(1).unwrap().propagation_rank, 2);
}

#[test]
fn test_propagation_rank_takes_longest_customer_chain() {
    // 3 is reachable from 1 directly and through 2
    let info = ASGraphInfo::new()
        .with_customer_provider(1, 2)
        .with_customer_provider(2, 3)
        .with_customer_provider(1, 3)
        .with_peers(3, 4);
    let as_graph = GraphBuilder::from_info(&info).finish().unwrap();

    assert_eq!(as_graph.get(3).unwrap().propagation_rank, 2);
    assert_eq!(as_graph.get(4).unwrap().propagation_rank, 0);
    for as_obj in as_graph.iter() {
        for provider in as_graph.resolve(&as_obj.providers) {
            assert!(provider.propagation_rank > as_obj.propagation_rank);
        }
    }
}

#[test]
fn test_self_link_is_rejected() {
    let info = ASGraphInfo::new().with_customer_provider(5, 5);
    assert_eq!(
        GraphBuilder::from_info(&info).finish().unwrap_err(),
        ConstructionError::SelfLink { asn: 5 }
    );

    let info = ASGraphInfo::new().with_peers(7, 7);
    assert_eq!(
        GraphBuilder::from_info(&info).finish().unwrap_err(),
        ConstructionError::SelfLink { asn: 7 }
    );
}

#[test]
fn test_reversed_customer_provider_link_is_ambiguous() {
    let mut builder = GraphBuilder::new();
    builder
        .add_customer_provider_link(CustomerProviderLink::new(1, 2))
        .add_customer_provider_link(CustomerProviderLink::new(2, 1));
    assert_eq!(
        builder.finish().unwrap_err(),
        ConstructionError::AmbiguousLink { asn1: 1, asn2: 2 }
    );
}

#[test]
fn test_peer_and_customer_provider_link_is_ambiguous() {
    let info = ASGraphInfo::new()
        .with_customer_provider(2, 1)
        .with_peers(1, 2);
    assert_eq!(
        GraphBuilder::from_info(&info).finish().unwrap_err(),
        ConstructionError::AmbiguousLink { asn1: 1, asn2: 2 }
    );
}

#[test]
fn test_customer_provider_cycle_is_rejected() {
    let info = ASGraphInfo::new()
        .with_customer_provider(1, 2)
        .with_customer_provider(2, 3)
        .with_customer_provider(3, 1);
    let err = GraphBuilder::from_info(&info).finish().unwrap_err();
    assert!(matches!(err, ConstructionError::CustomerProviderCycle { .. }));
}

#[test]
fn test_customer_cones() {
    let as_graph = GraphBuilder::from_info(
        &ASGraphInfo::new()
            .with_customer_provider(2, 1)
            .with_customer_provider(3, 1)
            .with_customer_provider(4, 2),
    )
    .store_customer_cone_asns(true)
    .finish()
    .unwrap();

    let as1 = as_graph.get(1).unwrap();
    assert_eq!(as1.customer_cone_size, 3);
    assert_eq!(as1.customer_cone_asns, Some(btreeset! {2, 3, 4}));
    assert_eq!(as_graph.get(2).unwrap().customer_cone_asns, Some(btreeset! {4}));
    assert_eq!(as_graph.get(4).unwrap().customer_cone_size, 0);

    // every cone is the union of the customers' cones plus the customers
    for as_obj in as_graph.iter() {
        if as_obj.is_stub() || as_obj.is_multihomed() {
            continue;
        }
        let mut expected = BTreeSet::new();
        for customer in as_graph.resolve(&as_obj.customers) {
            expected.insert(customer.asn);
            expected.extend(customer.customer_cone_asns.clone().unwrap());
        }
        assert_eq!(as_obj.customer_cone_asns, Some(expected));
    }
}

#[test]
fn test_customer_cone_asns_are_opt_in() {
    let as_graph = create_test_as_graph_simple();
    let as1 = as_graph.get(1).unwrap();
    assert_eq!(as1.customer_cone_size, 3);
    assert_eq!(as1.customer_cone_asns, None);
    assert_eq!(as1.provider_cone_size, None);
}

#[test]
fn test_stub_with_only_a_customer_has_empty_cone() {
    // 50 has a single neighbor, its customer 51
    let info = ASGraphInfo::new()
        .with_customer_provider(51, 50)
        .with_customer_provider(51, 52)
        .with_customer_provider(52, 53)
        .with_peers(53, 54);
    let as_graph = GraphBuilder::from_info(&info).finish().unwrap();

    assert!(as_graph.get(50).unwrap().is_stub());
    assert_eq!(as_graph.get(50).unwrap().customer_cone_size, 0);
    assert_eq!(as_graph.get(53).unwrap().customer_cone_size, 2);
}

#[test]
fn test_provider_cones() {
    let as_graph = GraphBuilder::from_info(
        &ASGraphInfo::new()
            .with_customer_provider(2, 1)
            .with_customer_provider(3, 1)
            .with_customer_provider(4, 2),
    )
    .store_provider_cone_asns(true)
    .finish()
    .unwrap();

    let as4 = as_graph.get(4).unwrap();
    assert_eq!(as4.provider_cone_size, Some(2));
    assert_eq!(as4.provider_cone_asns, Some(btreeset! {1, 2}));
    assert_eq!(as_graph.get(1).unwrap().provider_cone_size, Some(0));
}

#[test]
fn test_as_rank() {
    let as_graph = create_test_as_graph_simple();
    let ranks: Vec<_> = as_graph.iter().map(|a| (a.asn, a.as_rank)).collect();
    assert_eq!(ranks, vec![(1, 0), (2, 1), (3, 2), (4, 2)]);
}

#[test]
fn test_as_rank_ties_share_first_position() {
    let info = ASGraphInfo::new()
        .with_customer_provider(1, 10)
        .with_customer_provider(2, 10)
        .with_customer_provider(3, 20)
        .with_customer_provider(4, 20)
        .with_peers(10, 20);
    let as_graph = GraphBuilder::from_info(&info).finish().unwrap();

    assert_eq!(as_graph.get(10).unwrap().as_rank, 0);
    assert_eq!(as_graph.get(20).unwrap().as_rank, 0);
    for asn in 1..=4 {
        assert_eq!(as_graph.get(asn).unwrap().as_rank, 2);
    }
}

#[test]
fn test_asn_groups() {
    let info = ASGraphInfo::new()
        .with_customer_provider(2, 1)
        .with_customer_provider(3, 1)
        .with_customer_provider(4, 2)
        .with_customer_provider(5, 2)
        .with_customer_provider(5, 3)
        .with_peers(1, 100)
        .with_peers(2, 100)
        .with_ixp(100)
        .with_input_clique(1);
    let as_graph = GraphBuilder::from_info(&info).finish().unwrap();

    assert_eq!(as_graph.asn_group(ASNGroups::Ixp), &btreeset! {100});
    assert_eq!(as_graph.asn_group(ASNGroups::Stubs), &btreeset! {4});
    assert_eq!(as_graph.asn_group(ASNGroups::Multihomed), &btreeset! {5});
    assert_eq!(as_graph.asn_group(ASNGroups::StubsOrMh), &btreeset! {4, 5});
    assert_eq!(as_graph.asn_group(ASNGroups::Input), &btreeset! {1});
    assert_eq!(as_graph.asn_group(ASNGroups::Transit), &btreeset! {1, 2, 3});
    assert_eq!(as_graph.asn_group(ASNGroups::Etc), &btreeset! {2, 3});
    assert_eq!(as_graph.asn_group(ASNGroups::AllWoutIxps), &btreeset! {1, 2, 3, 4, 5});
    assert_eq!(as_graph.ixp_asns(), &btreeset! {100});
}

#[test]
fn test_as_factory_marks_ixps() {
    fn route_server_factory(asn: ASN, index: usize) -> AS {
        let mut as_obj = AS::new(asn, index);
        as_obj.ixp = asn >= 100;
        // overwritten by the builder
        as_obj.customer_cone_size = 42;
        as_obj
    }

    let info = ASGraphInfo::new()
        .with_customer_provider(2, 1)
        .with_peers(1, 100)
        .with_peers(2, 101)
        .with_ixp(101);
    let as_graph = GraphBuilder::from_info(&info)
        .with_as_factory(route_server_factory)
        .finish()
        .unwrap();

    assert_eq!(as_graph.ixp_asns(), &btreeset! {100, 101});
    assert_eq!(as_graph.asn_group(ASNGroups::Ixp), &btreeset! {100, 101});
    assert_eq!(as_graph.asn_group(ASNGroups::AllWoutIxps), &btreeset! {1, 2});
    assert_eq!(as_graph.get(1).unwrap().customer_cone_size, 1);
    assert_eq!(as_graph.get(1).unwrap().peers.len(), 1);
}

#[test]
fn test_graph_from_caida_file() {
    let path = std::env::temp_dir().join(format!("bgpsimulator-caida-{}.txt", std::process::id()));
    fs::write(
        &path,
        "# input clique: 1\n\
         # IXP ASes: 9\n\
         1|2|-1|bgp\n\
         1|3|-1|bgp\n\
         2|4|-1|bgp\n\
         2|3|0|bgp\n\
         1|9|0|bgp\n",
    )
    .unwrap();

    let info = CAIDAASGraphReader::new(&path).read().unwrap();
    fs::remove_file(&path).unwrap();
    let as_graph = GraphBuilder::from_info(&info).finish().unwrap();

    assert_eq!(as_graph.len(), 5);
    let as2 = as_graph.get(2).unwrap();
    assert_eq!(as_graph.relationship(as2, 1), Some(Relationships::Providers));
    assert_eq!(as_graph.relationship(as2, 3), Some(Relationships::Peers));
    assert_eq!(as_graph.relationship(as2, 4), Some(Relationships::Customers));
    assert_eq!(as_graph.asn_group(ASNGroups::Input), &btreeset! {1});
    assert_eq!(as_graph.asn_group(ASNGroups::Ixp), &btreeset! {9});
}

/// Providers always have a lower ASN than their customers, so the result is
/// acyclic
fn random_graph_info(seed: u64, num_ases: u32) -> ASGraphInfo {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut info = ASGraphInfo::new();
    let mut linked = HashSet::new();

    for customer in 2..=num_ases {
        for _ in 0..rng.gen_range(1..=2) {
            let provider = rng.gen_range(1..customer);
            if linked.insert((provider, customer)) {
                info = info.with_customer_provider(customer, provider);
            }
        }
    }
    for _ in 0..num_ases / 2 {
        let a = rng.gen_range(1..=num_ases);
        let b = rng.gen_range(1..=num_ases);
        if a != b && linked.insert((a.min(b), a.max(b))) {
            info = info.with_peers(a, b);
        }
    }
    info
}

#[test]
fn test_random_graphs_ranks_and_cones() {
    for seed in 0..8 {
        let info = random_graph_info(seed, 60);
        let as_graph = GraphBuilder::from_info(&info)
            .store_customer_cone_asns(true)
            .finish()
            .unwrap();

        for as_obj in as_graph.iter() {
            for provider in as_graph.resolve(&as_obj.providers) {
                assert!(
                    provider.propagation_rank > as_obj.propagation_rank,
                    "seed {}: AS {} ranks below its customer {}",
                    seed,
                    provider.asn,
                    as_obj.asn
                );
            }

            let cone = as_obj.customer_cone_asns.as_ref().unwrap();
            assert_eq!(as_obj.customer_cone_size, cone.len());
            if as_obj.is_stub() || as_obj.is_multihomed() {
                assert_eq!(as_obj.customer_cone_size, 0);
            } else {
                for customer in as_graph.resolve(&as_obj.customers) {
                    assert!(cone.contains(&customer.asn));
                }
            }
        }

        let ranked: usize = as_graph.propagation_ranks().iter().map(Vec::len).sum();
        assert_eq!(ranked, as_graph.len());
    }
}
