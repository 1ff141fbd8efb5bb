//! Per-pipeline memo of configure results.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::builder::strategy::StrategyId;
use crate::builder::toolchain::ToolchainDescriptor;

/// Configure results keyed by strategy identity.
///
/// Owned by one [`BuildPipeline`](crate::builder::pipeline::BuildPipeline),
/// so nothing carries over between runs.
#[derive(Debug, Default)]
pub struct StageMemo {
    entries: HashMap<StrategyId, ToolchainDescriptor>,
}

impl StageMemo {
    pub fn new() -> Self {
        StageMemo::default()
    }

    pub fn get(&self, id: &StrategyId) -> Option<&ToolchainDescriptor> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &StrategyId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the cached descriptor, running `f` only on a miss.
    ///
    /// A failing `f` caches nothing.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        id: StrategyId,
        f: impl FnOnce() -> Result<ToolchainDescriptor, E>,
    ) -> Result<&ToolchainDescriptor, E> {
        match self.entries.entry(id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(f()?)),
        }
    }
}
