use std::collections::{BTreeMap, HashMap};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::as_graphs::as_graph::{ASGraph, AS, ASN};
use crate::shared::{EngineError, Relationships, Settings};
use crate::simulation_engine::ann_containers::LocalRib;
use crate::simulation_engine::announcement::Announcement;
use crate::simulation_engine::policy::{
    create_policy_extension, Policy, PolicyContext, PolicyExtension,
};

/// `asn -> prefix -> as_path` of every local RIB
pub type RibSnapshot = BTreeMap<ASN, BTreeMap<String, Vec<ASN>>>;

/// What [`SimulationEngine::setup`] needs to know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub default_settings: Settings,
    #[serde(default)]
    pub settings_overrides: HashMap<ASN, Settings>,
    #[serde(default)]
    pub announcements: Vec<Announcement>,
    #[serde(default = "default_propagation_rounds")]
    pub propagation_rounds: u32,
}

fn default_propagation_rounds() -> u32 {
    1
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            default_settings: Settings::default(),
            settings_overrides: HashMap::new(),
            announcements: Vec::new(),
            propagation_rounds: default_propagation_rounds(),
        }
    }
}

impl EngineConfig {
    pub fn new(announcements: Vec<Announcement>) -> Self {
        EngineConfig {
            announcements,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn with_default_settings(mut self, settings: Settings) -> Self {
        self.default_settings = settings;
        self
    }

    pub fn with_override(mut self, asn: ASN, settings: Settings) -> Self {
        self.settings_overrides.insert(asn, settings);
        self
    }

    pub fn with_propagation_rounds(mut self, rounds: u32) -> Self {
        self.propagation_rounds = rounds;
        self
    }

    pub fn settings_for(&self, asn: ASN) -> Settings {
        self.settings_overrides
            .get(&asn)
            .copied()
            .unwrap_or(self.default_settings)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    NotSetup,
    Ready { next_round: u32 },
    Done,
}

/// Runs Gao-Rexford propagation over one AS graph.
///
/// `setup` gives every AS a fresh policy and seeds the announcements, then
/// `run` is called once per round, starting at 0. A failed round drops the
/// engine back to [`EngineState::NotSetup`].
pub struct SimulationEngine {
    as_graph: ASGraph,
    policies: Vec<Policy>,
    state: EngineState,
    propagation_rounds: u32,
}

impl SimulationEngine {
    pub fn new(as_graph: ASGraph) -> Self {
        SimulationEngine {
            as_graph,
            policies: Vec::new(),
            state: EngineState::NotSetup,
            propagation_rounds: 0,
        }
    }

    pub fn as_graph(&self) -> &ASGraph {
        &self.as_graph
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn propagation_rounds(&self) -> u32 {
        self.propagation_rounds
    }

    pub fn setup(&mut self, config: &EngineConfig) -> Result<(), EngineError> {
        self.setup_with(&config.announcements, config.propagation_rounds, |as_obj| {
            create_policy_extension(config.settings_for(as_obj.asn))
        })
    }

    /// Like [`setup`](Self::setup), with the extension of each AS chosen by
    /// `make_extension`.
    pub fn setup_with<F>(
        &mut self,
        announcements: &[Announcement],
        propagation_rounds: u32,
        mut make_extension: F,
    ) -> Result<(), EngineError>
    where
        F: FnMut(&AS) -> Box<dyn PolicyExtension>,
    {
        self.state = EngineState::NotSetup;
        self.policies = self
            .as_graph
            .iter()
            .map(|as_obj| Policy::new(as_obj, make_extension(as_obj)))
            .collect();

        for ann in announcements {
            let seed_asn = ann
                .seed_asn
                .ok_or(EngineError::MissingSeedAsn { prefix: ann.prefix })?;
            let index = self
                .as_graph
                .index_of(seed_asn)
                .ok_or(EngineError::UnknownSeedAsn { asn: seed_asn })?;
            self.policies[index].seed_ann(ann.clone())?;
        }

        info!(
            "engine set up: {} ASes, {} seeded announcements, {} rounds",
            self.policies.len(),
            announcements.len(),
            propagation_rounds
        );
        self.propagation_rounds = propagation_rounds;
        self.state = if propagation_rounds == 0 {
            EngineState::Done
        } else {
            EngineState::Ready { next_round: 0 }
        };
        Ok(())
    }

    /// Runs propagation round `round`, which must be the next one due.
    pub fn run(&mut self, round: u32) -> Result<(), EngineError> {
        match self.state {
            EngineState::NotSetup => return Err(EngineError::NotSetup),
            EngineState::Done => {
                return Err(EngineError::AlreadyDone {
                    rounds: self.propagation_rounds,
                })
            }
            EngineState::Ready { next_round } if next_round != round => {
                return Err(EngineError::OutOfSequence {
                    expected: next_round,
                    requested: round,
                })
            }
            EngineState::Ready { .. } => {}
        }

        debug!("propagation round {}", round);
        if let Err(e) = self.propagate(round) {
            warn!("propagation round {} failed: {}", round, e);
            self.state = EngineState::NotSetup;
            return Err(e);
        }

        self.state = if round + 1 >= self.propagation_rounds {
            EngineState::Done
        } else {
            EngineState::Ready { next_round: round + 1 }
        };
        Ok(())
    }

    /// Runs every remaining round.
    pub fn run_all(&mut self) -> Result<(), EngineError> {
        while let EngineState::Ready { next_round } = self.state {
            self.run(next_round)?;
        }
        match self.state {
            EngineState::Done => Ok(()),
            _ => Err(EngineError::NotSetup),
        }
    }

    fn propagate(&mut self, round: u32) -> Result<(), EngineError> {
        self.propagate_to_providers(round)?;
        self.propagate_to_peers(round)?;
        self.propagate_to_customers(round)
    }

    /// Leaves to core. From the second rank on, each rank first processes
    /// what its customers sent, then exports.
    fn propagate_to_providers(&mut self, round: u32) -> Result<(), EngineError> {
        let graph = &self.as_graph;
        for (i, rank) in graph.propagation_ranks().iter().enumerate() {
            if i > 0 {
                for &index in rank {
                    let ctx = context(graph, index, round);
                    self.policies[index].process_incoming_anns(&ctx, Relationships::Customers)?;
                }
            }
            for &index in rank {
                let ctx = context(graph, index, round);
                let deliveries = self.policies[index].propagate(&ctx, Relationships::Providers);
                deliver(graph, &mut self.policies, deliveries);
            }
        }
        Ok(())
    }

    /// Flat pass: everyone exports to peers, then everyone processes.
    fn propagate_to_peers(&mut self, round: u32) -> Result<(), EngineError> {
        let graph = &self.as_graph;
        for index in 0..graph.len() {
            let ctx = context(graph, index, round);
            let deliveries = self.policies[index].propagate(&ctx, Relationships::Peers);
            deliver(graph, &mut self.policies, deliveries);
        }
        for index in 0..graph.len() {
            let ctx = context(graph, index, round);
            self.policies[index].process_incoming_anns(&ctx, Relationships::Peers)?;
        }
        Ok(())
    }

    /// Core to leaves, mirroring [`propagate_to_providers`](Self::propagate_to_providers).
    fn propagate_to_customers(&mut self, round: u32) -> Result<(), EngineError> {
        let graph = &self.as_graph;
        for (i, rank) in graph.propagation_ranks().iter().rev().enumerate() {
            if i > 0 {
                for &index in rank {
                    let ctx = context(graph, index, round);
                    self.policies[index].process_incoming_anns(&ctx, Relationships::Providers)?;
                }
            }
            for &index in rank {
                let ctx = context(graph, index, round);
                let deliveries = self.policies[index].propagate(&ctx, Relationships::Customers);
                deliver(graph, &mut self.policies, deliveries);
            }
        }
        Ok(())
    }

    pub fn policy(&self, asn: ASN) -> Option<&Policy> {
        self.as_graph
            .index_of(asn)
            .and_then(|index| self.policies.get(index))
    }

    pub fn policies(&self) -> impl Iterator<Item = &Policy> {
        self.policies.iter()
    }

    pub fn local_rib(&self, asn: ASN) -> Option<&LocalRib> {
        self.policy(asn).map(|policy| &policy.local_rib)
    }

    pub fn local_rib_snapshot(&self) -> RibSnapshot {
        self.policies
            .iter()
            .map(|policy| {
                let ribs = policy
                    .local_rib
                    .iter()
                    .map(|(prefix, ann)| (prefix.to_string(), ann.as_path.clone()))
                    .collect();
                (policy.asn, ribs)
            })
            .collect()
    }
}

fn context(as_graph: &ASGraph, index: usize, propagation_round: u32) -> PolicyContext<'_> {
    PolicyContext {
        as_obj: as_graph.by_index(index),
        as_graph,
        propagation_round,
    }
}

fn deliver(as_graph: &ASGraph, policies: &mut [Policy], deliveries: Vec<(ASN, Announcement)>) {
    for (neighbor, ann) in deliveries {
        match as_graph.index_of(neighbor) {
            Some(index) => policies[index].receive_ann(ann),
            None => warn!("dropping {} for AS {}, which is not in the graph", ann.prefix, neighbor),
        }
    }
}
