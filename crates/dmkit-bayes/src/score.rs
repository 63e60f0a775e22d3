//! Bayesian (Dirichlet-multinomial, uniform prior) structure score
//!
//! For node `i` with arity `r_i` and parent instantiation `j`, the local
//! score accumulates
//!
//! ```text
//! lnΓ(r_i) − lnΓ(r_i + m_ij) + Σ_k lnΓ(1 + m_ijk)
//! ```
//!
//! over every combination of observed parent values, where `m_ijk` counts
//! rows with the node at value `k` under that combination. Unobserved
//! combinations are still enumerated and contribute their prior term.
//!
//! Cost per node is `O(rows + Π_p |values(p)| · r_i)`, exponential in the
//! number of parents; the search keeps parent sets small.

use std::collections::HashMap;

use dmkit_core::ObservationTable;

use crate::dag::Dag;

fn ln_gamma(x: f64) -> f64 {
    libm::lgamma(x)
}

/// Local score of `node` under its current parents in `dag`
pub fn local_score(dag: &Dag, node: usize, data: &ObservationTable) -> f64 {
    let ri = data.arity(node) as usize;
    let parents = dag.parents(node);
    let counts = count_by_instantiation(&parents, node, data);
    let zero = vec![0u32; ri];

    let mut score = 0.0;
    for_each_instantiation(&parents, data, |inst| {
        let node_counts = counts.get(inst).unwrap_or(&zero);
        let total: u32 = node_counts.iter().sum();

        score += ln_gamma(ri as f64) - ln_gamma((ri as u32 + total) as f64);
        for &m in node_counts {
            score += ln_gamma(1.0 + m as f64);
        }
    });
    score
}

/// Sum of local scores over all nodes
pub fn global_score(dag: &Dag, data: &ObservationTable) -> f64 {
    (0..dag.node_count())
        .map(|node| local_score(dag, node, data))
        .sum()
}

/// Counts of each node value per observed parent tuple, in one pass over the rows
fn count_by_instantiation(
    parents: &[usize],
    node: usize,
    data: &ObservationTable,
) -> HashMap<Vec<u32>, Vec<u32>> {
    let ri = data.arity(node) as usize;
    let column = data.column(node);
    let parent_columns: Vec<&[u32]> = parents.iter().map(|&p| data.column(p)).collect();

    let mut counts: HashMap<Vec<u32>, Vec<u32>> = HashMap::new();
    for (row, &value) in column.iter().enumerate() {
        let key: Vec<u32> = parent_columns.iter().map(|c| c[row]).collect();
        counts.entry(key).or_insert_with(|| vec![0; ri])[value as usize - 1] += 1;
    }
    counts
}

/// Visit the Cartesian product of the parents' observed values.
///
/// With no parents the single empty instantiation is visited.
fn for_each_instantiation<F>(parents: &[usize], data: &ObservationTable, mut visit: F)
where
    F: FnMut(&[u32]),
{
    let domains: Vec<&[u32]> = parents.iter().map(|&p| data.distinct_values(p)).collect();
    let mut cursor = vec![0usize; domains.len()];
    let mut inst: Vec<u32> = domains.iter().map(|d| d[0]).collect();

    loop {
        visit(&inst);

        // Odometer increment, last parent fastest
        let mut pos = domains.len();
        loop {
            if pos == 0 {
                return;
            }
            pos -= 1;
            cursor[pos] += 1;
            if cursor[pos] < domains[pos].len() {
                inst[pos] = domains[pos][cursor[pos]];
                break;
            }
            cursor[pos] = 0;
            inst[pos] = domains[pos][0];
        }
    }
}

/// Local scores per node, kept in step with a graph during a search pass
#[derive(Debug, Clone)]
pub struct ScoreCache {
    scores: Vec<f64>,
}

impl ScoreCache {
    /// Score every node of `dag` from scratch
    pub fn compute(dag: &Dag, data: &ObservationTable) -> Self {
        Self {
            scores: (0..dag.node_count())
                .map(|node| local_score(dag, node, data))
                .collect(),
        }
    }

    pub fn get(&self, node: usize) -> f64 {
        self.scores[node]
    }

    pub fn set(&mut self, node: usize, score: f64) {
        self.scores[node] = score;
    }

    pub fn total(&self) -> f64 {
        self.scores.iter().sum()
    }
}
