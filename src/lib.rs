//! Gao-Rexford BGP propagation over an AS relationship graph.
//!
//! Build an [`ASGraph`] with a [`GraphBuilder`], hand it to a
//! [`SimulationEngine`], seed announcements through an [`EngineConfig`] and
//! run the propagation rounds. The final local RIBs are the result.

pub mod as_graphs;
pub mod shared;
pub mod simulation_engine;
pub mod simulation_framework;

// Re-export commonly used types at the crate root
pub use as_graphs::{ASGraph, ASGraphInfo, CustomerProviderLink, GraphBuilder, PeerLink, AS, ASN};
pub use shared::{
    ASNGroups, CommonASNs, ConstructionError, EngineError, ROAValidity, Relationships, Settings,
};
pub use simulation_engine::{
    Announcement, EngineConfig, EngineState, Policy, PolicyContext, PolicyExtension, Prefix,
    SimulationEngine,
};
pub use simulation_framework::Simulation;
