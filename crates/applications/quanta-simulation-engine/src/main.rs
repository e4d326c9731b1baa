//! Quanta Simulation Engine CLI
//!
//! Runs a workload under one or more scheduling policies and compares the results

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quanta_simulation_engine::{
    config::{ScenarioFile, SchedulerConfig, default_policies},
    metrics::SchedulingMetrics,
    simulator::{self, SimulationResult},
    types::{Process, Time, TraceSlot},
};

#[derive(Parser, Debug)]
#[command(name = "quanta-sim")]
#[command(about = "Simulate and compare CPU scheduling policies", long_about = None)]
struct Args {
    /// Scenario JSON file with the workload and optional policy list
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Policies to run (comma-separated: rr,priority,preemptive-priority,mlq,mlfq)
    #[arg(short, long)]
    policies: Option<String>,

    /// Context switch overhead applied to every policy
    #[arg(long)]
    overhead: Option<Time>,

    /// Print the execution trace of each run
    #[arg(long)]
    trace: bool,

    /// Output JSON file path (optional)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log scheduling decisions
    #[arg(short, long)]
    verbose: bool,
}

/// One entry of the JSON report
#[derive(Serialize)]
struct RunReport<'a> {
    #[serde(flatten)]
    result: &'a SimulationResult,
    metrics: SchedulingMetrics,
}

/// Workload used when no scenario file is given
fn demo_workload() -> Vec<Process> {
    vec![
        Process::new(1, "P1", 0, 10, 2),
        Process::new(2, "P2", 1, 5, 1),
        Process::new(3, "P3", 2, 8, 3),
        Process::new(4, "P4", 3, 3, 0),
        Process::new(5, "P5", 4, 6, 1),
    ]
}

fn select_policies(available: Vec<SchedulerConfig>, filter: Option<&str>) -> Vec<SchedulerConfig> {
    let Some(filter) = filter else {
        return available;
    };

    let wanted: Vec<&str> = filter.split(',').map(|s| s.trim()).collect();
    for label in &wanted {
        if !available.iter().any(|c| c.label() == *label) {
            warn!(policy = %label, "unknown or unconfigured policy, skipping");
        }
    }
    available
        .into_iter()
        .filter(|c| wanted.contains(&c.label()))
        .collect()
}

fn print_processes(result: &SimulationResult) {
    println!("\n{}", result.policy_name);
    println!("{}", "-".repeat(82));
    println!(
        "{:<10} {:>8} {:>7} {:>9} {:>11} {:>9} {:>11} {:>10}",
        "Process", "Arrival", "Burst", "Priority", "Completion", "Waiting", "Turnaround", "Response"
    );

    for p in &result.processes {
        println!(
            "{:<10} {:>8} {:>7} {:>9} {:>11} {:>9} {:>11} {:>10}",
            p.name,
            p.arrival_time,
            p.burst_time,
            p.initial_priority,
            p.completion_time.unwrap_or_default(),
            p.waiting_time,
            p.turnaround_time.unwrap_or_default(),
            p.response_time.unwrap_or_default(),
        );
    }
}

fn print_trace(result: &SimulationResult) {
    let label = |slot: TraceSlot| match slot {
        TraceSlot::Run(pid) => result
            .processes
            .iter()
            .find(|p| p.id == pid)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("P{pid}")),
        TraceSlot::Idle => "idle".to_string(),
        TraceSlot::Switch => "switch".to_string(),
    };

    println!("  Trace:");
    for segment in result.trace.segments() {
        println!(
            "    {:>4} - {:<4} {}",
            segment.start,
            segment.end,
            label(segment.slot)
        );
    }
}

fn print_comparison(results: &[SimulationResult]) {
    println!("\n╔══════════════════════════════════════════════════════════╗");
    println!("║  Policy Comparison                                       ║");
    println!("╚══════════════════════════════════════════════════════════╝\n");

    println!(
        "{:<50} {:>9} {:>11} {:>9} {:>8} {:>11} {:>9}",
        "Policy", "Avg Wait", "Avg Turn", "Avg Resp", "CPU %", "Throughput", "Switches"
    );
    println!("{}", "-".repeat(113));

    for result in results {
        let m = result.metrics();
        println!(
            "{:<50} {:>9.2} {:>11.2} {:>9.2} {:>8.2} {:>11.3} {:>9}",
            result.policy_name,
            m.average_waiting_time,
            m.average_turnaround_time,
            m.average_response_time,
            m.cpu_utilization,
            m.throughput,
            m.context_switches,
        );
    }

    let best = results.iter().min_by(|a, b| {
        a.metrics()
            .average_waiting_time
            .total_cmp(&b.metrics().average_waiting_time)
    });
    if let Some(best) = best {
        println!("\nLowest average waiting time: {}", best.policy_name);
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "quanta_simulation_engine=debug,info"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let (processes, configured) = match &args.scenario {
        Some(path) => {
            let scenario = ScenarioFile::load(path)
                .with_context(|| format!("failed to load scenario {}", path.display()))?;
            info!(path = %path.display(), processes = scenario.processes.len(), "scenario loaded");
            (scenario.workload(), scenario.policies_or_default())
        }
        None => (demo_workload(), default_policies()),
    };

    let mut policies = select_policies(configured, args.policies.as_deref());
    if policies.is_empty() {
        anyhow::bail!("no policies selected");
    }
    if let Some(overhead) = args.overhead {
        for policy in &mut policies {
            policy.set_context_switch_overhead(overhead);
        }
    }

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║  Quanta Simulation Engine                                ║");
    println!("╚══════════════════════════════════════════════════════════╝\n");
    println!("Configuration:");
    println!("  Processes: {}", processes.len());
    println!("  Policies: {}", policies.len());

    let results = simulator::compare(&processes, &policies).context("simulation failed")?;

    for result in &results {
        print_processes(result);
        if args.trace {
            print_trace(result);
        }
    }

    if results.len() > 1 {
        print_comparison(&results);
    }

    if let Some(output_path) = args.output {
        println!("\nWriting results to {}...", output_path.display());
        let reports: Vec<RunReport> = results
            .iter()
            .map(|result| RunReport {
                result,
                metrics: result.metrics(),
            })
            .collect();
        let json = serde_json::to_string_pretty(&reports)?;
        fs::write(&output_path, json)
            .with_context(|| format!("failed to write {}", output_path.display()))?;
        println!("  Results saved");
    }

    println!("\n✅ Simulation complete!\n");
    Ok(())
}
