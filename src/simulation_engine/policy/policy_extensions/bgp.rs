use crate::simulation_engine::policy::PolicyExtension;

/// Plain BGP with Gao-Rexford preferences: every hook keeps its default.
#[derive(Debug, Clone)]
pub struct BGPPolicy;

impl PolicyExtension for BGPPolicy {
    fn name(&self) -> &str {
        "BGP"
    }
}
