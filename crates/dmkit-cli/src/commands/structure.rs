//! Bayesian network structure learning

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use dmkit_bayes::learn_structure;
use dmkit_core::ObservationTable;

use super::RunSummary;
use crate::config::Config;

#[derive(Args)]
pub struct StructureArgs {
    /// CSV file with a header row of variable names
    pub infile: PathBuf,

    /// Output graph file (`parent,child` per line); a `.dot` file is written next to it
    pub outfile: PathBuf,

    /// Maximum number of parents per node
    #[arg(long)]
    pub max_parents: Option<usize>,
}

pub async fn run(args: StructureArgs, config: &Config, json: bool) -> Result<()> {
    let data = ObservationTable::load(&args.infile)
        .with_context(|| format!("Failed to load {}", args.infile.display()))?;
    info!(
        "Loaded {} variables x {} rows from {}",
        data.num_variables(),
        data.num_rows(),
        args.infile.display()
    );

    let mut search = config.search.clone();
    if let Some(max_parents) = args.max_parents {
        search.max_parents = max_parents;
    }

    let start = Instant::now();
    let report = tokio::task::spawn_blocking(move || learn_structure(&data, &search))
        .await
        .context("Structure search task failed")?;
    let elapsed = start.elapsed().as_secs_f64();

    report
        .dag
        .save_gph(&args.outfile)
        .with_context(|| format!("Failed to write {}", args.outfile.display()))?;
    let dot_path = args.outfile.with_extension("dot");
    std::fs::write(&dot_path, report.dag.to_dot())
        .with_context(|| format!("Failed to write {}", dot_path.display()))?;

    if json {
        return RunSummary::new(
            "structure",
            elapsed,
            serde_json::json!({
                "input": args.infile,
                "output": args.outfile,
                "dot": dot_path,
                "report": report,
            }),
        )
        .print();
    }

    println!("Structure Search");
    println!("================\n");
    println!("Score:      {}", report.score);
    println!("Iterations: {}", report.iterations);
    println!("Converged:  {}", report.converged);
    println!("Time:       {elapsed:.3}s");
    println!("\nEdges ({}):", report.dag.edge_count());
    for (parent, child) in report.dag.named_edges() {
        println!("  {parent} -> {child}");
    }
    println!("\nGraph written to {}", args.outfile.display());
    println!("DOT written to {}", dot_path.display());

    Ok(())
}
