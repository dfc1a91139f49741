use std::collections::BTreeSet;
use std::thread;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::as_graphs::as_graph::{ASGraph, ASN};
use crate::shared::{ASNGroups, TrialError};
use crate::simulation_engine::engine::{EngineConfig, RibSnapshot, SimulationEngine};

/// Final local RIBs of one trial
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialOutcome {
    pub trial: usize,
    pub snapshot: RibSnapshot,
}

/// Runs independent trials over one topology, in parallel.
///
/// Every trial gets its own copy of the graph and its own engine; workers
/// share nothing mutable.
pub struct Simulation {
    pub as_graph: ASGraph,

    /// Number of trials to run
    pub num_trials: usize,

    /// Worker threads
    pub parse_cpus: usize,

    pub show_progress: bool,
}

impl Simulation {
    pub fn new(as_graph: ASGraph) -> Self {
        Simulation {
            as_graph,
            num_trials: 10,
            parse_cpus: num_cpus::get().max(1),
            show_progress: true,
        }
    }

    pub fn with_num_trials(mut self, trials: usize) -> Self {
        self.num_trials = trials;
        self
    }

    pub fn with_parse_cpus(mut self, cpus: usize) -> Self {
        self.parse_cpus = cpus.max(1);
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Runs every trial and returns the outcomes ordered by trial number.
    ///
    /// `make_config` builds the engine configuration of a trial from its
    /// number and the topology. The first failing trial (lowest number) is
    /// reported.
    pub fn run<F>(&self, make_config: F) -> Result<Vec<TrialOutcome>, TrialError>
    where
        F: Fn(usize, &ASGraph) -> EngineConfig + Sync,
    {
        let start_time = Instant::now();
        let pb = if self.show_progress {
            let pb = ProgressBar::new(self.num_trials as u64);
            pb.set_style(
                ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} trials")?
                    .progress_chars("##-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let workers = self.parse_cpus.min(self.num_trials).max(1);
        let mut results: Vec<Result<TrialOutcome, TrialError>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let pb = &pb;
                    let make_config = &make_config;
                    scope.spawn(move || {
                        (worker..self.num_trials)
                            .step_by(workers)
                            .map(|trial| {
                                let outcome = self.run_trial(trial, make_config);
                                pb.inc(1);
                                outcome
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(outcomes) => outcomes,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });
        pb.finish();

        results.sort_by_key(|result| match result {
            Ok(outcome) => outcome.trial,
            Err(TrialError::Engine { trial, .. }) => *trial,
            Err(_) => usize::MAX,
        });
        info!(
            "ran {} trials on {} workers in {:.2}s",
            self.num_trials,
            workers,
            start_time.elapsed().as_secs_f64()
        );
        results.into_iter().collect()
    }

    fn run_trial<F>(&self, trial: usize, make_config: &F) -> Result<TrialOutcome, TrialError>
    where
        F: Fn(usize, &ASGraph) -> EngineConfig,
    {
        let config = make_config(trial, &self.as_graph);
        let mut engine = SimulationEngine::new(self.as_graph.clone());
        engine
            .setup(&config)
            .and_then(|_| engine.run_all())
            .map_err(|source| TrialError::Engine { trial, source })?;
        Ok(TrialOutcome {
            trial,
            snapshot: engine.local_rib_snapshot(),
        })
    }
}

/// Picks `percent` of the non-IXP ASes, reproducibly for a given `seed`.
pub fn random_adopting_asns(as_graph: &ASGraph, percent: f64, seed: u64) -> BTreeSet<ASN> {
    let candidates: Vec<ASN> = as_graph
        .asn_group(ASNGroups::AllWoutIxps)
        .iter()
        .copied()
        .collect();
    let count = ((candidates.len() as f64) * percent / 100.0).round() as usize;
    let mut rng = StdRng::seed_from_u64(seed);
    candidates
        .choose_multiple(&mut rng, count.min(candidates.len()))
        .copied()
        .collect()
}
