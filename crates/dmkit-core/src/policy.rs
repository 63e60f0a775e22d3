//! Policies and policy files

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// 1-based action id as written to policy files
pub type ActionId = usize;

/// One action id per state, in the problem's output enumeration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    actions: Vec<ActionId>,
}

impl Policy {
    pub fn new(actions: Vec<ActionId>) -> Self {
        Self { actions }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Action for a 0-based position in enumeration order
    pub fn action(&self, idx: usize) -> Option<ActionId> {
        self.actions.get(idx).copied()
    }

    pub fn actions(&self) -> &[ActionId] {
        &self.actions
    }

    /// Number of states assigned to each action id, indexed by `id - 1`
    pub fn histogram(&self, num_actions: usize) -> Vec<usize> {
        let mut counts = vec![0; num_actions];
        for &a in &self.actions {
            if let Some(slot) = a.checked_sub(1).and_then(|i| counts.get_mut(i)) {
                *slot += 1;
            }
        }
        counts
    }

    /// Write one action id per line
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        for a in &self.actions {
            writeln!(writer, "{a}")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the policy file at `path`
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        info!("Writing policy for {} states to {:?}", self.len(), path);
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))
    }
}

impl From<Vec<ActionId>> for Policy {
    fn from(actions: Vec<ActionId>) -> Self {
        Self::new(actions)
    }
}
