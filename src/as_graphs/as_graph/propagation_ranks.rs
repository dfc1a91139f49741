use super::AS;
use crate::shared::ConstructionError;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Rejects cycles along customer->provider edges.
///
/// Iterative three-colour DFS, so deep provider chains cannot overflow the
/// call stack.
pub(super) fn check_for_cycles(ases: &[AS]) -> Result<(), ConstructionError> {
    let mut color = vec![Color::White; ases.len()];

    for start in 0..ases.len() {
        if color[start] != Color::White {
            continue;
        }
        // (node, position of the next provider to visit)
        let mut stack = vec![(start, 0usize)];
        color[start] = Color::Gray;

        while let Some((node, next)) = stack.pop() {
            match ases[node].providers.get(next) {
                Some(&provider) => {
                    stack.push((node, next + 1));
                    match color[provider] {
                        Color::Gray => {
                            return Err(ConstructionError::CustomerProviderCycle {
                                asn: ases[provider].asn,
                            });
                        }
                        Color::White => {
                            color[provider] = Color::Gray;
                            stack.push((provider, 0));
                        }
                        Color::Black => {}
                    }
                }
                None => color[node] = Color::Black,
            }
        }
    }
    Ok(())
}

/// Assigns every AS its propagation rank and returns the ASN-sorted buckets.
///
/// `assign(as, rank)` keeps the maximum rank seen and only walks up to the
/// providers when the value grew. It is started from every AS, so an AS
/// reachable through customer chains of different lengths ends up with the
/// longest one. The graph must already be known to be acyclic.
pub(super) fn assign_propagation_ranks(ases: &mut [AS]) -> Vec<Vec<usize>> {
    let mut ranks: Vec<Option<u32>> = vec![None; ases.len()];
    let mut stack: Vec<(usize, u32)> = Vec::new();

    for start in 0..ases.len() {
        stack.push((start, 0));
        while let Some((node, rank)) = stack.pop() {
            if ranks[node].map_or(false, |current| current >= rank) {
                continue;
            }
            ranks[node] = Some(rank);
            for &provider in &ases[node].providers {
                stack.push((provider, rank + 1));
            }
        }
    }

    let mut buckets: Vec<Vec<usize>> = Vec::new();
    for (i, as_obj) in ases.iter_mut().enumerate() {
        let rank = ranks[i].unwrap_or(0);
        as_obj.propagation_rank = rank;
        let rank = rank as usize;
        if buckets.len() <= rank {
            buckets.resize_with(rank + 1, Vec::new);
        }
        // arena order is ASN order, so each bucket stays sorted
        buckets[rank].push(i);
    }
    buckets
}
