use std::error::Error;

use log::info;

use bgpsimulator::shared::ROAValidity;
use bgpsimulator::simulation_framework::random_adopting_asns;
use bgpsimulator::{
    ASGraph, ASGraphInfo, Announcement, CommonASNs, EngineConfig, GraphBuilder, Prefix,
    Settings, Simulation, SimulationEngine,
};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    println!("BGP Simulator - Rust\n");

    run_simple_propagation_example()?;
    println!("\n{}\n", "=".repeat(80));
    run_hijack_scenario_example()?;
    println!("\n{}\n", "=".repeat(80));
    run_defense_scenario_example()?;
    Ok(())
}

/// Example 1: one prefix announced by a stub, followed up the hierarchy
fn run_simple_propagation_example() -> Result<(), Box<dyn Error>> {
    println!("Example 1: Simple BGP Propagation");
    println!("---------------------------------");

    let as_graph = GraphBuilder::from_info(
        &ASGraphInfo::new()
            .with_customer_provider(65002, 65001)
            .with_customer_provider(65003, 65002)
            .with_input_clique(65001),
    )
    .finish()?;

    let prefix: Prefix = "10.0.0.0/24".parse()?;
    let config = EngineConfig::new(vec![Announcement::seeded(prefix, 65003)]);

    let mut engine = SimulationEngine::new(as_graph);
    engine.setup(&config)?;
    engine.run_all()?;

    println!("\nFinal routing state:");
    for (asn, ribs) in engine.local_rib_snapshot() {
        println!("\nAS {}:", asn);
        for (prefix, path) in ribs {
            println!("  {} -> {:?}", prefix, path);
        }
    }
    Ok(())
}

/// Example 2: a subprefix hijack competing with the legitimate prefix
fn run_hijack_scenario_example() -> Result<(), Box<dyn Error>> {
    println!("Example 2: Subprefix Hijack Attack");
    println!("----------------------------------");

    let as_graph = create_attack_topology()?;
    let config = hijack_config(Settings::BaseDefense)?;
    let mut engine = SimulationEngine::new(as_graph);
    engine.setup(&config)?;
    engine.run_all()?;

    let (attacker_count, victim_count) = count_outcomes(&engine)?;
    println!("ASes routing to attacker: {}", attacker_count);
    println!("ASes routing to victim: {}", victim_count);
    println!(
        "Attack success rate: {:.1}%",
        percentage(attacker_count, attacker_count + victim_count)
    );
    Ok(())
}

/// Example 3: the same attack with half of the ASes running ROV, over
/// several randomly chosen adopter sets
fn run_defense_scenario_example() -> Result<(), Box<dyn Error>> {
    println!("Example 3: Defense with ROV (Route Origin Validation)");
    println!("----------------------------------------------------");

    let as_graph = create_attack_topology()?;
    let base_config = hijack_config(Settings::BaseDefense)?;
    let simulation = Simulation::new(as_graph).with_num_trials(8);

    let outcomes = simulation.run(|trial, as_graph| {
        let mut config = base_config.clone();
        for asn in random_adopting_asns(as_graph, 50.0, trial as u64) {
            config.settings_overrides.insert(asn, Settings::Rov);
        }
        config
    })?;

    let hijacked = "10.0.0.0/25";
    for outcome in &outcomes {
        let attacker_count = outcome
            .snapshot
            .values()
            .filter(|ribs| ribs.contains_key(hijacked))
            .count();
        info!("trial {}: {} ASes hijacked", outcome.trial, attacker_count);
        println!(
            "Trial {}: {:.1}% of ASes hold the hijacked route",
            outcome.trial,
            percentage(attacker_count, outcome.snapshot.len())
        );
    }
    Ok(())
}

fn hijack_config(default_settings: Settings) -> Result<EngineConfig, Box<dyn Error>> {
    let legitimate_prefix: Prefix = "10.0.0.0/24".parse()?;
    let hijacked_prefix: Prefix = "10.0.0.0/25".parse()?;

    Ok(EngineConfig::new(vec![
        Announcement::seeded(legitimate_prefix, CommonASNs::VICTIM)
            .with_roa_validity(ROAValidity::Valid),
        Announcement::seeded(hijacked_prefix, CommonASNs::ATTACKER)
            .with_roa_validity(ROAValidity::InvalidLength),
    ])
    .with_default_settings(default_settings))
}

fn count_outcomes(engine: &SimulationEngine) -> Result<(usize, usize), Box<dyn Error>> {
    let legitimate_prefix: Prefix = "10.0.0.0/24".parse()?;
    let hijacked_prefix: Prefix = "10.0.0.0/25".parse()?;
    let mut attacker_count = 0;
    let mut victim_count = 0;

    for policy in engine.policies() {
        if let Some(ann) = policy.local_rib.get(&hijacked_prefix) {
            if ann.origin() == CommonASNs::ATTACKER {
                attacker_count += 1;
            }
        } else if let Some(ann) = policy.local_rib.get(&legitimate_prefix) {
            if ann.origin() == CommonASNs::VICTIM {
                victim_count += 1;
            }
        }
    }
    Ok((attacker_count, victim_count))
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Victim and attacker each dual-homed below a small transit layer.
fn create_attack_topology() -> Result<ASGraph, Box<dyn Error>> {
    let mut info = ASGraphInfo::new()
        .with_customer_provider(CommonASNs::VICTIM, 1)
        .with_customer_provider(CommonASNs::VICTIM, 2)
        .with_customer_provider(CommonASNs::ATTACKER, 3)
        .with_customer_provider(CommonASNs::ATTACKER, 4);
    for (customer, provider) in [(1, 5), (3, 5), (2, 6), (4, 6), (1, 7), (2, 7), (3, 8), (4, 8)] {
        info = info.with_customer_provider(customer, provider);
    }
    for tier_1 in 5..=8 {
        info = info.with_input_clique(tier_1);
    }
    info = info.with_peers(5, 6).with_peers(7, 8).with_peers(5, 8);

    Ok(GraphBuilder::from_info(&info).finish()?)
}
