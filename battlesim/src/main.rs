use anyhow::{Context, Result};
use battlesim_core::analyze::progress::SideTotals;
use battlesim_core::profiling::{init_tracy, TraceLevel};
use battlesim_core::{
    run_battle, run_until, start_analysis, AllRolls, AnalysisReport, Battle, BranchWeighting,
    JsonLinesObserver, LogObserver, ObserverRegistry, Outcome, Performance, ReducedRolls, Side,
};
use clap::Parser;
use std::path::PathBuf;

mod scenario;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scenario file (JSON)
    #[arg(short, long)]
    scenario: PathBuf,

    /// Stop after this many rounds instead of fighting to the end
    #[arg(short, long)]
    rounds: Option<i32>,

    /// Estimate outcome probabilities instead of fighting one battle
    #[arg(short, long)]
    analyze: bool,

    /// Seed for random dice (derived from the scenario when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Analysis preset (custom, very-accurate, accurate, normal, fast, very-fast)
    #[arg(long)]
    performance: Option<Performance>,

    /// Nodes expanded per analysis chunk
    #[arg(long)]
    chunk_size: Option<i64>,

    /// Phases explored before a branch is counted as incomplete
    #[arg(long)]
    max_depth: Option<i64>,

    /// Weight every dice combination at every depth
    #[arg(long)]
    all_rolls: bool,

    /// Evaluate chunks on the rayon thread pool
    #[arg(long)]
    parallel: bool,

    /// Print analysis progress as JSON lines on stdout
    #[arg(long)]
    json: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Tracy trace level (only with the tracy feature)
    #[arg(long, default_value = "info")]
    trace_level: TraceLevel,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = std::str::FromStr::from_str(&args.log_level).unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();
    init_tracy(args.trace_level);

    let mut scenario = scenario::load_scenario(&args.scenario)?;
    let settings = &mut scenario.settings;
    if let Some(performance) = args.performance {
        settings.performance = performance;
    }
    if let Some(chunk_size) = args.chunk_size {
        settings.chunk_size = chunk_size;
    }
    if let Some(max_depth) = args.max_depth {
        settings.max_depth = max_depth;
    }
    settings.parallel |= args.parallel;
    settings.validate().context("Invalid settings")?;

    let battle = scenario.build(args.seed)?;

    if args.analyze {
        analyze(battle, &scenario, &args)
    } else {
        simulate(battle, &scenario, args.rounds);
        Ok(())
    }
}

fn simulate(mut battle: Battle, scenario: &scenario::Scenario, rounds: Option<i32>) {
    let outcome = match rounds {
        Some(round) => {
            run_until(&mut battle, &scenario.settings, round);
            battle.outcome
        }
        None => run_battle(&mut battle, &scenario.settings),
    };

    match outcome {
        Some(outcome) => println!("Outcome: {} after {} rounds", describe(outcome), battle.round),
        None => println!("Outcome: undecided at round {}", battle.round),
    }
    print_side("Attacker", &battle.attacker);
    print_side("Defender", &battle.defender);
}

fn describe(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::AttackerWins => "attacker wins",
        Outcome::DefenderWins => "defender wins",
        Outcome::Draw => "draw",
    }
}

fn print_side(label: &str, side: &Side) {
    let totals = SideTotals::of(side);
    println!(
        "{}: {} cohorts left, {} defeated, morale {:.2}, strength {:.3}{}",
        label,
        side.live_count(),
        side.cohorts.defeated().len(),
        totals.morale.to_f64(),
        totals.strength.to_f64(),
        if side.stack_wiped { " (stack wiped)" } else { "" }
    );
}

fn analyze(battle: Battle, scenario: &scenario::Scenario, args: &Args) -> Result<()> {
    let mut observers = ObserverRegistry::new();
    if args.json {
        observers.register(Box::new(JsonLinesObserver::stdout()));
    } else {
        observers.register(Box::new(LogObserver::new().with_frequency(10)));
    }

    let weighting: Box<dyn BranchWeighting> = if args.all_rolls {
        Box::new(AllRolls)
    } else {
        Box::new(ReducedRolls)
    };
    let handle = start_analysis(battle, scenario.settings.clone(), weighting, observers)?;
    let report = handle.join()?;
    if !args.json {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &AnalysisReport) {
    let snapshot = &report.snapshot;
    if let Some(wr) = &snapshot.win_rate {
        println!("Attacker wins: {:.2}%", wr.attacker * 100.0);
        println!("Defender wins: {:.2}%", wr.defender * 100.0);
        println!("Draws:         {:.2}%", wr.draws * 100.0);
        println!("Incomplete:    {:.2}%", wr.incomplete * 100.0);
        println!("Average rounds: {:.1}", wr.average_rounds);
    }
    if let Some(casualties) = &snapshot.casualties {
        println!(
            "Remaining strength: attacker {:.1}%, defender {:.1}%",
            casualties.attacker.average_strength * 100.0,
            casualties.defender.average_strength * 100.0
        );
    }
    if let Some(losses) = &snapshot.resource_losses {
        println!(
            "Losses: attacker {:.1}, defender {:.1}",
            losses.attacker.destroyed_cost + losses.attacker.captured_cost,
            losses.defender.destroyed_cost + losses.defender.captured_cost
        );
    }
    println!(
        "{} chunks, {} nodes in {:.2?}",
        report.metrics.chunks, report.metrics.nodes, report.metrics.wall_time
    );
}
