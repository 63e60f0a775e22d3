//! Score-driven structure search
//!
//! Each outer iteration runs one K2 pass (greedy best-parent addition per
//! node, at most `max_parents` additions per node per pass) and one
//! edge-reversal pass. The search stops when
//! two consecutive iterations produce bit-identical global scores.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use dmkit_core::ObservationTable;

use crate::dag::{Dag, EdgeChange};
use crate::score::{global_score, local_score, ScoreCache};

/// Structure search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum number of parents a K2 pass adds to one node
    pub max_parents: usize,

    /// Safety bound on outer iterations
    pub max_outer_iterations: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_parents: 1,
            max_outer_iterations: 100,
        }
    }
}

/// Result of one search pass
#[derive(Debug, Clone)]
pub struct PassOutcome {
    pub dag: Dag,
    pub changes: Vec<EdgeChange>,
}

/// Result of a full structure search
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub dag: Dag,
    pub score: f64,
    pub iterations: usize,
    pub converged: bool,
    /// Global score before the first iteration and after each one
    pub score_history: Vec<f64>,
    /// Committed edits, in order
    pub changes: Vec<EdgeChange>,
}

/// K2 pass: for each node in column order, repeatedly add the single parent
/// that most improves its local score until nothing improves or the pass
/// has added `max_parents` parents to it. Parents from earlier passes do
/// not count towards the bound.
pub fn k2(dag: &Dag, data: &ObservationTable, max_parents: usize) -> PassOutcome {
    info!("Running K2 parent search (max_parents = {})", max_parents);
    let mut current = dag.clone();
    let mut scores = ScoreCache::compute(&current, data);
    let mut changes = Vec::new();

    for node in 0..current.node_count() {
        let mut added = 0;
        while added < max_parents {
            let mut best_score = scores.get(node);
            let mut best: Option<(Dag, EdgeChange)> = None;

            for candidate in 0..current.node_count() {
                if candidate == node
                    || current.has_edge(candidate, node)
                    || current.has_edge(node, candidate)
                {
                    continue;
                }
                let change = EdgeChange::Add {
                    parent: candidate,
                    child: node,
                };
                let Some(next) = current.try_apply(change) else {
                    continue;
                };
                let score = local_score(&next, node, data);
                if score > best_score {
                    best_score = score;
                    best = Some((next, change));
                }
            }

            let Some((next, change)) = best else {
                break;
            };
            let before = scores.total();
            scores.set(node, best_score);
            debug!(
                "{} -> {}: {} -> {}",
                current.name(change_parent(change)),
                current.name(node),
                before,
                scores.total()
            );
            current = next;
            changes.push(change);
            added += 1;
        }
    }

    PassOutcome {
        dag: current,
        changes,
    }
}

/// Edge-reversal pass over a snapshot of the edges present at pass start.
///
/// A reversal is committed only if it keeps the graph acyclic and strictly
/// improves the two endpoints' summed local score.
pub fn optimize_edge_directions(dag: &Dag, data: &ObservationTable) -> PassOutcome {
    info!("Running edge direction optimization");
    let mut current = dag.clone();
    let mut scores = ScoreCache::compute(&current, data);
    let mut changes = Vec::new();

    for (parent, child) in dag.edges() {
        if !current.has_edge(parent, child) {
            continue;
        }
        let change = EdgeChange::Reverse { parent, child };
        let Some(next) = current.try_apply(change) else {
            continue;
        };

        let old = scores.get(parent) + scores.get(child);
        let new_parent = local_score(&next, parent, data);
        let new_child = local_score(&next, child, data);
        if new_parent + new_child > old {
            let before = scores.total();
            scores.set(parent, new_parent);
            scores.set(child, new_child);
            debug!(
                "swap {} -> {}: {} -> {}",
                current.name(parent),
                current.name(child),
                before,
                scores.total()
            );
            current = next;
            changes.push(change);
        }
    }

    PassOutcome {
        dag: current,
        changes,
    }
}

/// Learn a structure for `data` starting from the edgeless graph
pub fn learn_structure(data: &ObservationTable, config: &SearchConfig) -> SearchReport {
    let mut dag = Dag::from_table(data);
    let mut score = global_score(&dag, data);
    let mut score_history = vec![score];
    let mut changes = Vec::new();
    let mut iterations = 0;
    let mut converged = false;

    info!(
        "Learning structure over {} variables, {} rows (initial score {})",
        data.num_variables(),
        data.num_rows(),
        score
    );

    while iterations < config.max_outer_iterations {
        iterations += 1;

        let parents = k2(&dag, data, config.max_parents);
        let reversed = optimize_edge_directions(&parents.dag, data);
        changes.extend(parents.changes);
        changes.extend(reversed.changes);
        dag = reversed.dag;

        let new_score = global_score(&dag, data);
        score_history.push(new_score);
        info!("Iteration {}: score {} -> {}", iterations, score, new_score);

        if new_score == score {
            converged = true;
            break;
        }
        score = new_score;
    }

    if !converged {
        warn!(
            "Structure search stopped after {} iterations without converging",
            iterations
        );
    }

    SearchReport {
        dag,
        score,
        iterations,
        converged,
        score_history,
        changes,
    }
}

fn change_parent(change: EdgeChange) -> usize {
    match change {
        EdgeChange::Add { parent, .. } | EdgeChange::Reverse { parent, .. } => parent,
    }
}
