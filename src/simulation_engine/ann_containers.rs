//! Per-policy route tables and queues.

use std::collections::{BTreeMap, HashMap};

use crate::as_graphs::as_graph::ASN;
use crate::shared::Relationships;
use crate::simulation_engine::announcement::{Announcement, Prefix};

/// Best route per prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalRib {
    anns: HashMap<Prefix, Announcement>,
}

impl LocalRib {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, prefix: &Prefix) -> Option<&Announcement> {
        self.anns.get(prefix)
    }

    /// Inserts or replaces the entry for the announcement's prefix.
    pub fn add(&mut self, ann: Announcement) -> Option<Announcement> {
        self.anns.insert(ann.prefix, ann)
    }

    pub fn remove(&mut self, prefix: &Prefix) -> Option<Announcement> {
        self.anns.remove(prefix)
    }

    pub fn contains(&self, prefix: &Prefix) -> bool {
        self.anns.contains_key(prefix)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Prefix, &Announcement)> {
        self.anns.iter()
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &Prefix> {
        self.anns.keys()
    }

    pub fn len(&self) -> usize {
        self.anns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anns.is_empty()
    }
}

/// Announcements delivered by neighbors and not yet processed, per prefix.
#[derive(Debug, Clone, Default)]
pub struct RecvQueue {
    anns: HashMap<Prefix, Vec<Announcement>>,
}

impl RecvQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, ann: Announcement) {
        self.anns.entry(ann.prefix).or_default().push(ann);
    }

    pub fn get(&self, prefix: &Prefix) -> &[Announcement] {
        self.anns.get(prefix).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Empties the queue. Within each prefix, withdrawals come first, then
    /// everything is ordered by sending neighbor.
    pub fn take(&mut self) -> Vec<(Prefix, Vec<Announcement>)> {
        std::mem::take(&mut self.anns)
            .into_iter()
            .map(|(prefix, mut anns)| {
                anns.sort_by_key(|ann| (!ann.withdraw, ann.next_hop_asn));
                (prefix, anns)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.anns.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.anns.values().all(Vec::is_empty)
    }
}

/// An unprocessed announcement as received, plus the relationship it came over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnInfo {
    pub unprocessed_ann: Announcement,
    pub recv_relationship: Relationships,
}

/// Adj-RIB-In: the latest accepted announcement per neighbor and prefix.
#[derive(Debug, Clone, Default)]
pub struct RibsIn {
    entries: BTreeMap<ASN, HashMap<Prefix, AnnInfo>>,
}

impl RibsIn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, neighbor: ASN, prefix: &Prefix) -> Option<&AnnInfo> {
        self.entries.get(&neighbor)?.get(prefix)
    }

    /// Stores `ann` under its sending neighbor, replacing any older entry.
    pub fn add(&mut self, ann: Announcement, recv_relationship: Relationships) -> Option<AnnInfo> {
        self.entries.entry(ann.next_hop_asn).or_default().insert(
            ann.prefix,
            AnnInfo {
                unprocessed_ann: ann,
                recv_relationship,
            },
        )
    }

    pub fn remove(&mut self, neighbor: ASN, prefix: &Prefix) -> Option<AnnInfo> {
        let by_prefix = self.entries.get_mut(&neighbor)?;
        let removed = by_prefix.remove(prefix);
        if by_prefix.is_empty() {
            self.entries.remove(&neighbor);
        }
        removed
    }

    /// Every neighbor's entry for `prefix`, in ASN order.
    pub fn ann_infos<'a>(&'a self, prefix: &'a Prefix) -> impl Iterator<Item = &'a AnnInfo> + 'a {
        self.entries.values().filter_map(move |by_prefix| by_prefix.get(prefix))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Adj-RIB-Out: the last announcement sent per neighbor and prefix.
#[derive(Debug, Clone, Default)]
pub struct RibsOut {
    entries: BTreeMap<ASN, HashMap<Prefix, Announcement>>,
}

impl RibsOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, neighbor: ASN, prefix: &Prefix) -> Option<&Announcement> {
        self.entries.get(&neighbor)?.get(prefix)
    }

    pub fn add(&mut self, neighbor: ASN, ann: Announcement) {
        self.entries.entry(neighbor).or_default().insert(ann.prefix, ann);
    }

    pub fn remove(&mut self, neighbor: ASN, prefix: &Prefix) -> Option<Announcement> {
        let by_prefix = self.entries.get_mut(&neighbor)?;
        let removed = by_prefix.remove(prefix);
        if by_prefix.is_empty() {
            self.entries.remove(&neighbor);
        }
        removed
    }

    pub fn neighbors(&self) -> Vec<ASN> {
        self.entries.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What is waiting to go out to one neighbor for one prefix
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendInfo {
    pub withdrawal_ann: Option<Announcement>,
    pub ann: Option<Announcement>,
}

/// Pending exports, flushed neighbor by neighbor.
#[derive(Debug, Clone, Default)]
pub struct SendQueue {
    entries: BTreeMap<ASN, HashMap<Prefix, SendInfo>>,
}

impl SendQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `ann` in the withdrawal or announcement slot, by its flag.
    pub fn add(&mut self, neighbor: ASN, ann: Announcement) {
        let info = self
            .entries
            .entry(neighbor)
            .or_default()
            .entry(ann.prefix)
            .or_default();
        if ann.withdraw {
            info.withdrawal_ann = Some(ann);
        } else {
            info.ann = Some(ann);
        }
    }

    pub fn get(&self, neighbor: ASN, prefix: &Prefix) -> Option<&SendInfo> {
        self.entries.get(&neighbor)?.get(prefix)
    }

    /// Drops a pending withdrawal of exactly `ann`. Returns whether one was
    /// dropped, in which case the neighbor still holds `ann` from before.
    pub fn cancel_withdrawal(&mut self, neighbor: ASN, ann: &Announcement) -> bool {
        let Some(info) = self
            .entries
            .get_mut(&neighbor)
            .and_then(|by_prefix| by_prefix.get_mut(&ann.prefix))
        else {
            return false;
        };
        let matches = info
            .withdrawal_ann
            .as_ref()
            .map_or(false, |withdrawal| *withdrawal == ann.as_withdrawal());
        if matches {
            info.withdrawal_ann = None;
        }
        matches
    }

    /// Everything queued for `neighbor`, withdrawals first. The queue keeps
    /// it until [`reset`](Self::reset).
    pub fn pending(&self, neighbor: ASN) -> Vec<Announcement> {
        let Some(by_prefix) = self.entries.get(&neighbor) else {
            return Vec::new();
        };
        let mut withdrawals = Vec::new();
        let mut anns = Vec::new();
        for info in by_prefix.values() {
            withdrawals.extend(info.withdrawal_ann.iter().cloned());
            anns.extend(info.ann.iter().cloned());
        }
        withdrawals.extend(anns);
        withdrawals
    }

    /// Clears `neighbor` after a flush.
    pub fn reset(&mut self, neighbor: ASN) {
        self.entries.remove(&neighbor);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|by_prefix| {
            by_prefix
                .values()
                .all(|info| info.withdrawal_ann.is_none() && info.ann.is_none())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ann(prefix: &str, path: Vec<ASN>) -> Announcement {
        let prefix: Prefix = prefix.parse().unwrap();
        let mut ann =
            Announcement::seeded(prefix, *path.last().unwrap()).with_as_path(path.clone());
        ann.next_hop_asn = path[0];
        ann
    }

    #[test]
    fn local_rib_add_replaces() {
        let mut rib = LocalRib::new();
        assert!(rib.add(ann("10.0.0.0/8", vec![1])).is_none());
        let old = rib.add(ann("10.0.0.0/8", vec![2, 1])).unwrap();
        assert_eq!(old.as_path, vec![1]);
        assert_eq!(rib.len(), 1);
    }

    #[test]
    fn recv_queue_orders_withdrawals_first() {
        let mut q = RecvQueue::new();
        q.add(ann("10.0.0.0/8", vec![5, 9]));
        q.add(ann("10.0.0.0/8", vec![3, 9]));
        q.add(ann("10.0.0.0/8", vec![7, 9]).as_withdrawal());
        assert_eq!(q.len(), 3);

        let taken = q.take();
        assert!(q.is_empty());
        assert_eq!(taken.len(), 1);
        let order: Vec<(bool, ASN)> =
            taken[0].1.iter().map(|a| (a.withdraw, a.next_hop_asn)).collect();
        assert_eq!(order, vec![(true, 7), (false, 3), (false, 5)]);
    }

    #[test]
    fn ribs_in_keyed_by_sender() {
        let mut ribs_in = RibsIn::new();
        let prefix: Prefix = "10.0.0.0/8".parse().unwrap();
        ribs_in.add(ann("10.0.0.0/8", vec![4, 9]), Relationships::Peers);
        ribs_in.add(ann("10.0.0.0/8", vec![2, 9]), Relationships::Customers);

        let senders: Vec<ASN> = ribs_in
            .ann_infos(&prefix)
            .map(|i| i.unprocessed_ann.next_hop_asn)
            .collect();
        assert_eq!(senders, vec![2, 4]);

        let removed = ribs_in.remove(4, &prefix).unwrap();
        assert_eq!(removed.recv_relationship, Relationships::Peers);
        assert!(ribs_in.remove(4, &prefix).is_none());
        assert!(ribs_in.get(2, &prefix).is_some());
    }

    #[test]
    fn send_queue_flushes_withdrawal_before_ann() {
        let mut send_q = SendQueue::new();
        let old = ann("10.0.0.0/8", vec![1, 9]);
        let new = ann("10.0.0.0/8", vec![1, 8, 9]);
        send_q.add(2, new.clone());
        send_q.add(2, old.as_withdrawal());

        let out = send_q.pending(2);
        assert_eq!(out, vec![old.as_withdrawal(), new]);
        assert_eq!(send_q.pending(2).len(), 2);
        send_q.reset(2);
        assert!(send_q.pending(2).is_empty());
        assert!(send_q.is_empty());
    }

    #[test]
    fn send_queue_cancels_matching_withdrawal_only() {
        let mut send_q = SendQueue::new();
        let sent = ann("10.0.0.0/8", vec![1, 9]);
        let other = ann("10.0.0.0/8", vec![1, 8, 9]);
        send_q.add(2, sent.as_withdrawal());

        assert!(!send_q.cancel_withdrawal(2, &other));
        assert!(!send_q.cancel_withdrawal(3, &sent));
        assert!(send_q.cancel_withdrawal(2, &sent));
        assert!(send_q.is_empty());
    }

    #[test]
    fn send_queue_reset_only_touches_one_neighbor() {
        let mut send_q = SendQueue::new();
        let a = ann("10.0.0.0/8", vec![1, 9]);
        send_q.add(2, a.clone());
        send_q.add(3, a.clone());

        send_q.reset(2);
        assert!(send_q.get(2, &a.prefix).is_none());
        assert_eq!(send_q.get(3, &a.prefix).and_then(|info| info.ann.as_ref()), Some(&a));
    }

    #[test]
    fn local_rib_prefixes_and_recv_queue_lookup() {
        let mut rib = LocalRib::new();
        rib.add(ann("10.0.0.0/8", vec![1]));
        rib.add(ann("10.1.0.0/16", vec![1]));
        assert_eq!(rib.prefixes().count(), 2);

        let mut q = RecvQueue::new();
        let a = ann("10.0.0.0/8", vec![5, 9]);
        q.add(a.clone());
        assert_eq!(q.get(&a.prefix), &[a.clone()][..]);
        assert!(q.get(&"10.1.0.0/16".parse().unwrap()).is_empty());
    }
}
