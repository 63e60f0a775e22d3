//! MDP policy computation

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::info;

use dmkit_core::sample::load_samples;
use dmkit_core::TransitionSample;
use dmkit_rl::{GridWorld, MovingCar, PolicySolver, QLearning};

use super::RunSummary;
use crate::config::Config;

/// Bundled problem instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Problem {
    /// 10x10 grid world solved by value iteration
    Small,
    /// Moving car with an empirical kernel solved by value iteration
    Medium,
    /// Large sparse problem solved by Q-learning
    Large,
}

impl Problem {
    pub fn name(self) -> &'static str {
        match self {
            Problem::Small => "small",
            Problem::Medium => "medium",
            Problem::Large => "large",
        }
    }

    pub fn input_file(self) -> String {
        format!("{}.csv", self.name())
    }

    pub fn default_output(self) -> PathBuf {
        PathBuf::from(format!("{}.policy", self.name()))
    }
}

#[derive(Args)]
pub struct PolicyArgs {
    /// Problem instance to solve
    #[arg(value_enum)]
    pub problem: Problem,

    /// Directory holding the `<problem>.csv` sample files
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Policy output file (defaults to `<problem>.policy`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Build the solver for `problem`; kernel estimation and table allocation happen here
pub fn build_solver(
    problem: Problem,
    samples: Vec<TransitionSample>,
    config: &Config,
) -> dmkit_core::Result<Box<dyn PolicySolver>> {
    let solver: Box<dyn PolicySolver> = match problem {
        Problem::Small => Box::new(GridWorld::from_samples(&samples, config.grid.clone())?),
        Problem::Medium => Box::new(MovingCar::from_samples(&samples, config.car.clone())?),
        Problem::Large => Box::new(QLearning::with_samples(config.qlearning.clone(), samples)),
    };
    Ok(solver)
}

pub async fn run(args: PolicyArgs, config: &Config, json: bool) -> Result<()> {
    let data_dir = args.data_dir.unwrap_or_else(|| config.data_dir.clone());
    let input = data_dir.join(args.problem.input_file());
    let output = args.output.unwrap_or_else(|| args.problem.default_output());

    let samples =
        load_samples(&input).with_context(|| format!("Failed to load {}", input.display()))?;
    info!("Loaded {} samples from {}", samples.len(), input.display());

    let start = Instant::now();
    let problem = args.problem;
    let settings = config.clone();
    let (solver, policy) = tokio::task::spawn_blocking(move || {
        let mut solver = build_solver(problem, samples, &settings)?;
        let policy = solver.solve()?;
        Ok::<_, dmkit_core::DmError>((solver, policy))
    })
    .await
    .context("Solver task failed")?
    .with_context(|| format!("{} solver failed", problem.name()))?;
    let elapsed = start.elapsed().as_secs_f64();

    policy
        .save(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if json {
        return RunSummary::new(
            "policy",
            elapsed,
            serde_json::json!({
                "problem": args.problem.name(),
                "solver": solver.name(),
                "input": input,
                "output": output,
                "states": policy.len(),
                "params": solver.get_params(),
            }),
        )
        .print();
    }

    println!("Policy ({})", args.problem.name());
    println!("=============\n");
    println!("Solver: {}", solver.name());
    println!("States: {}", policy.len());
    println!("Time:   {elapsed:.3}s");
    println!("Params: {}", solver.get_params());
    println!("\nPolicy written to {}", output.display());

    Ok(())
}
