pub mod policy_extensions;

use log::{trace, warn};

use crate::as_graphs::as_graph::{ASGraph, AS, ASN};
use crate::shared::{EngineError, Relationships, Settings};
use crate::simulation_engine::ann_containers::{
    AnnInfo, LocalRib, RecvQueue, RibsIn, RibsOut, SendQueue,
};
use crate::simulation_engine::announcement::{Announcement, Prefix};
use crate::simulation_engine::gao_rexford::{self, Candidate};

/// Read-only view handed to every policy hook
#[derive(Clone, Copy)]
pub struct PolicyContext<'a> {
    pub as_obj: &'a AS,
    pub as_graph: &'a ASGraph,
    pub propagation_round: u32,
}

/// The seams through which routing-security variants change BGP behavior.
///
/// Every method has the plain Gao-Rexford behavior as its default, so an
/// extension only overrides what it changes:
/// * validity of incoming announcements ([`valid_ann`](Self::valid_ann)),
/// * export filtering ([`should_propagate`](Self::should_propagate) and
///   [`process_outgoing_ann`](Self::process_outgoing_ann)),
/// * route comparison, one step at a time or as a whole.
///
/// Overrides of the comparison must keep its order: relationship, then path
/// length, then tie-break.
pub trait PolicyExtension: Send + Sync {
    fn name(&self) -> &str;

    /// Routing loops are rejected before this is consulted.
    fn valid_ann(
        &self,
        _ctx: &PolicyContext<'_>,
        ann: &Announcement,
        _recv_relationship: Relationships,
    ) -> bool {
        bgp_valid_ann(ann)
    }

    fn should_propagate(
        &self,
        _ctx: &PolicyContext<'_>,
        ann: &Announcement,
        send_relationship: Relationships,
    ) -> bool {
        gao_rexford_should_propagate(ann, send_relationship)
    }

    /// Last chance to rewrite or drop an announcement bound for `neighbor`.
    fn process_outgoing_ann(
        &self,
        _ctx: &PolicyContext<'_>,
        ann: Announcement,
        _neighbor: &AS,
        _send_relationship: Relationships,
    ) -> Option<Announcement> {
        Some(ann)
    }

    fn new_rel_better(
        &self,
        _ctx: &PolicyContext<'_>,
        current: &Candidate<'_>,
        new: &Candidate<'_>,
    ) -> Option<bool> {
        gao_rexford::new_rel_better(current, new)
    }

    fn new_as_path_shorter(
        &self,
        _ctx: &PolicyContext<'_>,
        current: &Candidate<'_>,
        new: &Candidate<'_>,
    ) -> Option<bool> {
        gao_rexford::new_as_path_shorter(current, new)
    }

    fn new_wins_ties(
        &self,
        _ctx: &PolicyContext<'_>,
        current: &Candidate<'_>,
        new: &Candidate<'_>,
    ) -> Option<bool> {
        gao_rexford::new_wins_ties(current, new)
    }

    /// Whether `new` should replace `current`.
    ///
    /// A missing route always loses. Two candidates that survive every step
    /// are a [`EngineError::TieBreakViolation`].
    fn new_ann_better(
        &self,
        ctx: &PolicyContext<'_>,
        current: Option<Candidate<'_>>,
        new: Option<Candidate<'_>>,
    ) -> Result<bool, EngineError> {
        let (current, new) = match (current, new) {
            (_, None) => return Ok(false),
            (None, Some(_)) => return Ok(true),
            (Some(current), Some(new)) => (current, new),
        };
        if let Some(better) = self.new_rel_better(ctx, &current, &new) {
            return Ok(better);
        }
        if let Some(better) = self.new_as_path_shorter(ctx, &current, &new) {
            return Ok(better);
        }
        self.new_wins_ties(ctx, &current, &new)
            .ok_or_else(|| EngineError::TieBreakViolation {
                asn: ctx.as_obj.asn,
                prefix: new.ann.prefix,
                current_path: current.ann.as_path.clone(),
                new_path: new.ann.as_path.clone(),
            })
    }
}

/// Structural check shared by every policy: a received path names its sender.
pub fn bgp_valid_ann(ann: &Announcement) -> bool {
    !ann.as_path.is_empty()
}

/// Valley-free export: customer-learned and originated routes go everywhere,
/// everything else only to customers.
pub fn gao_rexford_should_propagate(ann: &Announcement, send_relationship: Relationships) -> bool {
    match send_relationship {
        Relationships::Customers => true,
        Relationships::Providers | Relationships::Peers => matches!(
            ann.recv_relationship,
            Relationships::Customers | Relationships::Origin
        ),
        Relationships::Origin => false,
    }
}

pub fn create_policy_extension(settings: Settings) -> Box<dyn PolicyExtension> {
    use policy_extensions::*;

    match settings {
        Settings::BaseDefense => Box::new(bgp::BGPPolicy),
        Settings::Rov => Box::new(rov::ROVPolicy),
        Settings::PeerRov => Box::new(peer_rov::PeerROVPolicy),
        Settings::OnlyToCustomers => Box::new(only_to_customers::OnlyToCustomersPolicy),
    }
}

/// Routing state of one AS: its RIBs, its queues and the extension deciding
/// how it treats routes.
///
/// A policy refers back to its AS by ASN and arena index only.
pub struct Policy {
    pub asn: ASN,
    pub as_index: usize,
    pub local_rib: LocalRib,
    pub recv_q: RecvQueue,
    pub ribs_in: RibsIn,
    pub ribs_out: RibsOut,
    pub send_q: SendQueue,
    extension: Box<dyn PolicyExtension>,
}

impl Policy {
    pub fn new(as_obj: &AS, extension: Box<dyn PolicyExtension>) -> Self {
        Policy {
            asn: as_obj.asn,
            as_index: as_obj.index,
            local_rib: LocalRib::new(),
            recv_q: RecvQueue::new(),
            ribs_in: RibsIn::new(),
            ribs_out: RibsOut::new(),
            send_q: SendQueue::new(),
            extension,
        }
    }

    pub fn with_settings(as_obj: &AS, settings: Settings) -> Self {
        Self::new(as_obj, create_policy_extension(settings))
    }

    pub fn name(&self) -> &str {
        self.extension.name()
    }

    /// Puts a seed announcement into the local RIB as originated here.
    ///
    /// An empty path becomes `[asn]`, any other path must start with `asn`.
    /// Never overwrites an existing entry.
    pub fn seed_ann(&mut self, mut ann: Announcement) -> Result<(), EngineError> {
        if self.local_rib.contains(&ann.prefix) {
            return Err(EngineError::SeedConflict {
                asn: self.asn,
                prefix: ann.prefix,
            });
        }
        match ann.as_path.first().copied() {
            None => ann.as_path.push(self.asn),
            Some(first) if first == self.asn => {}
            Some(_) => {
                return Err(EngineError::MalformedSeedPath {
                    asn: self.asn,
                    prefix: ann.prefix,
                    as_path: ann.as_path,
                });
            }
        }
        if ann.withdraw {
            warn!(
                "AS {}: seeded withdrawal for {} treated as an announcement",
                self.asn, ann.prefix
            );
            ann.withdraw = false;
        }
        ann.next_hop_asn = self.asn;
        ann.seed_asn = Some(self.asn);
        ann.recv_relationship = Relationships::Origin;
        self.local_rib.add(ann);
        Ok(())
    }

    pub fn receive_ann(&mut self, ann: Announcement) {
        self.recv_q.add(ann);
    }

    /// Loop check followed by the extension's validity hook.
    pub fn valid_ann(
        &self,
        ctx: &PolicyContext<'_>,
        ann: &Announcement,
        recv_relationship: Relationships,
    ) -> bool {
        if ann.as_path.contains(&self.asn) {
            trace!(
                "AS {}: routing loop, dropping {} via {:?}",
                self.asn,
                ann.prefix,
                ann.as_path
            );
            return false;
        }
        let valid = self.extension.valid_ann(ctx, ann, recv_relationship);
        if !valid {
            trace!(
                "AS {} ({}): rejected {} via {:?}",
                self.asn,
                self.name(),
                ann.prefix,
                ann.as_path
            );
        }
        valid
    }

    /// Processes everything in the receive queue, all of it received over
    /// `from_rel`.
    ///
    /// Withdrawals are handled before announcements. When the best route for a
    /// prefix changes, the old one is withdrawn from every neighbor it was
    /// sent to.
    pub fn process_incoming_anns(
        &mut self,
        ctx: &PolicyContext<'_>,
        from_rel: Relationships,
    ) -> Result<(), EngineError> {
        for (prefix, anns) in self.recv_q.take() {
            let og_ann = self.local_rib.get(&prefix).cloned();
            let mut current = og_ann.clone();

            for ann in anns {
                let neighbor = ann.next_hop_asn;
                let replaced = self.ribs_in.remove(neighbor, &prefix).is_some();
                if ann.withdraw && !replaced {
                    trace!(
                        "AS {}: withdrawal of {} from AS {} matches nothing",
                        self.asn,
                        prefix,
                        neighbor
                    );
                }
                // explicit or implicit withdrawal of the current best route
                if replaced && learned_from(current.as_ref(), neighbor) {
                    current = self.select_best_ribs_in(ctx, &prefix)?;
                }
                if ann.withdraw || !self.valid_ann(ctx, &ann, from_rel) {
                    continue;
                }

                let better = self.extension.new_ann_better(
                    ctx,
                    current.as_ref().map(Candidate::processed),
                    Some(Candidate::unprocessed(&ann, from_rel)),
                )?;
                if better {
                    current = Some(ann.copy_and_process(self.asn, from_rel));
                }
                self.ribs_in.add(ann, from_rel);
            }

            if current != og_ann {
                match current {
                    Some(best) => {
                        self.local_rib.add(best);
                    }
                    None => {
                        self.local_rib.remove(&prefix);
                    }
                }
                if og_ann.is_some() {
                    self.withdraw_from_neighbors(&prefix);
                }
            }
        }
        Ok(())
    }

    /// Best Adj-RIB-In candidate for `prefix`, processed.
    fn select_best_ribs_in(
        &self,
        ctx: &PolicyContext<'_>,
        prefix: &Prefix,
    ) -> Result<Option<Announcement>, EngineError> {
        let mut best: Option<&AnnInfo> = None;
        for info in self.ribs_in.ann_infos(prefix) {
            let new = Candidate::unprocessed(&info.unprocessed_ann, info.recv_relationship);
            let current =
                best.map(|b| Candidate::unprocessed(&b.unprocessed_ann, b.recv_relationship));
            if self.extension.new_ann_better(ctx, current, Some(new))? {
                best = Some(info);
            }
        }
        Ok(best.map(|info| {
            info.unprocessed_ann.copy_and_process(self.asn, info.recv_relationship)
        }))
    }

    /// Queues a withdrawal of whatever was last sent for `prefix`.
    fn withdraw_from_neighbors(&mut self, prefix: &Prefix) {
        for neighbor in self.ribs_out.neighbors() {
            if let Some(sent) = self.ribs_out.remove(neighbor, prefix) {
                trace!("AS {}: withdrawing {} from AS {}", self.asn, prefix, neighbor);
                self.send_q.add(neighbor, sent.as_withdrawal());
            }
        }
    }

    /// Exports the local RIB to every neighbor of kind `send_rel` and flushes
    /// the send queue for those neighbors.
    ///
    /// Returns what each neighbor must receive, in delivery order. An
    /// announcement identical to the last one sent to a neighbor is not sent
    /// again.
    pub fn propagate(
        &mut self,
        ctx: &PolicyContext<'_>,
        send_rel: Relationships,
    ) -> Vec<(ASN, Announcement)> {
        let mut deliveries = Vec::new();

        for neighbor in ctx.as_graph.neighbors(ctx.as_obj, send_rel) {
            for (_, ann) in self.local_rib.iter() {
                if !self.extension.should_propagate(ctx, ann, send_rel) {
                    continue;
                }
                let mut outgoing = ann.clone();
                outgoing.next_hop_asn = self.asn;
                let Some(mut outgoing) =
                    self.extension.process_outgoing_ann(ctx, outgoing, neighbor, send_rel)
                else {
                    continue;
                };
                // the receiver identifies the sender by this
                outgoing.next_hop_asn = self.asn;

                if self.send_q.cancel_withdrawal(neighbor.asn, &outgoing) {
                    self.ribs_out.add(neighbor.asn, outgoing);
                    continue;
                }
                if self.ribs_out.get(neighbor.asn, &outgoing.prefix) == Some(&outgoing) {
                    trace!(
                        "AS {}: {} already sent to AS {}",
                        self.asn,
                        outgoing.prefix,
                        neighbor.asn
                    );
                    continue;
                }
                self.send_q.add(neighbor.asn, outgoing);
            }

            for ann in self.send_q.pending(neighbor.asn) {
                if !ann.withdraw {
                    self.ribs_out.add(neighbor.asn, ann.clone());
                }
                deliveries.push((neighbor.asn, ann));
            }
            self.send_q.reset(neighbor.asn);
        }
        deliveries
    }
}

fn learned_from(ann: Option<&Announcement>, neighbor: ASN) -> bool {
    matches!(
        ann,
        Some(ann) if ann.recv_relationship != Relationships::Origin && ann.next_hop_asn == neighbor
    )
}
