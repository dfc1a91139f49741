use std::cmp::Reverse;
use std::collections::BTreeSet;

use super::{AS, ASN};

/// Fills in `customer_cone_size` (and optionally `customer_cone_asns`).
///
/// Stubs and multihomed ASes have an empty cone by definition, even a stub
/// whose only neighbor is a customer.
pub(super) fn add_customer_cones(ases: &mut [AS], store_asns: bool) {
    let seeded: Vec<Option<BTreeSet<ASN>>> = ases
        .iter()
        .map(|as_obj| {
            if as_obj.is_stub() || as_obj.is_multihomed() {
                Some(BTreeSet::new())
            } else {
                None
            }
        })
        .collect();
    let cones = cones_along(ases, seeded, |as_obj| &as_obj.customers);

    for (as_obj, cone) in ases.iter_mut().zip(cones) {
        as_obj.customer_cone_size = cone.len();
        as_obj.customer_cone_asns = store_asns.then_some(cone);
    }
}

pub(super) fn add_provider_cones(ases: &mut [AS], store_asns: bool) {
    let cones = cones_along(ases, vec![None; ases.len()], |as_obj| &as_obj.providers);

    for (as_obj, cone) in ases.iter_mut().zip(cones) {
        as_obj.provider_cone_size = Some(cone.len());
        as_obj.provider_cone_asns = store_asns.then_some(cone);
    }
}

/// Memoized transitive closure along one edge direction.
///
/// `memo` may carry pre-filled cones that are used as-is. Post-order walk on
/// an explicit stack; the edge direction must be acyclic.
fn cones_along<F>(ases: &[AS], mut memo: Vec<Option<BTreeSet<ASN>>>, next: F) -> Vec<BTreeSet<ASN>>
where
    F: Fn(&AS) -> &Vec<usize>,
{
    for start in 0..ases.len() {
        if memo[start].is_some() {
            continue;
        }
        let mut stack = vec![(start, false)];
        while let Some((node, expanded)) = stack.pop() {
            if memo[node].is_some() {
                continue;
            }
            if !expanded {
                stack.push((node, true));
                for &neighbor in next(&ases[node]) {
                    if memo[neighbor].is_none() {
                        stack.push((neighbor, false));
                    }
                }
                continue;
            }
            let mut cone = BTreeSet::new();
            for &neighbor in next(&ases[node]) {
                cone.insert(ases[neighbor].asn);
                if let Some(neighbor_cone) = &memo[neighbor] {
                    cone.extend(neighbor_cone.iter().copied());
                }
            }
            memo[node] = Some(cone);
        }
    }
    memo.into_iter().map(Option::unwrap_or_default).collect()
}

/// AS rank by customer cone size, largest first, ties broken by ASN.
///
/// Tied ASes share the rank of the first AS of their tie group, and the
/// counter keeps advancing through the tie: sizes 100, 100, 99 get ranks
/// 0, 0, 2.
pub(super) fn add_as_rank(ases: &mut [AS]) {
    let mut order: Vec<usize> = (0..ases.len()).collect();
    order.sort_by_key(|&i| (Reverse(ases[i].customer_cone_size), ases[i].asn));

    let mut previous: Option<(usize, usize)> = None;
    for (position, &i) in order.iter().enumerate() {
        let size = ases[i].customer_cone_size;
        let rank = match previous {
            Some((last_size, last_rank)) if last_size == size => last_rank,
            _ => position,
        };
        ases[i].as_rank = rank;
        previous = Some((size, rank));
    }
}
