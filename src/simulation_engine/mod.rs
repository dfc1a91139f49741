pub mod ann_containers;
pub mod announcement;
pub mod engine;
pub mod gao_rexford;
pub mod policy;

pub use ann_containers::{AnnInfo, LocalRib, RecvQueue, RibsIn, RibsOut, SendInfo, SendQueue};
pub use announcement::{Announcement, Prefix};
pub use engine::{EngineConfig, EngineState, RibSnapshot, SimulationEngine};
pub use gao_rexford::Candidate;
pub use policy::{create_policy_extension, Policy, PolicyContext, PolicyExtension};
