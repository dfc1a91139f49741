pub mod simulation;

pub use simulation::{random_adopting_asns, Simulation, TrialOutcome};
