//! In-process registry mapping a node kind key to its executor
//! (grounded on the reference workspace's action registry: a plain
//! `HashMap` behind a lock-free read path via `Arc`, not a plugin loader).

use std::collections::HashMap;
use std::sync::Arc;

use flowcore_core::Key;

use crate::executor::NodeExecutor;

#[derive(Default)]
pub struct NodeRegistry {
    executors: HashMap<Key, Arc<dyn NodeExecutor>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `executor` under its own declared `kind_key`. Returns the
    /// previous executor if one was already registered under that key.
    pub fn register(&mut self, executor: Arc<dyn NodeExecutor>) -> Option<Arc<dyn NodeExecutor>> {
        let key = executor.definition().kind_key.clone();
        self.executors.insert(key, executor)
    }

    #[must_use]
    pub fn get(&self, kind_key: &Key) -> Option<Arc<dyn NodeExecutor>> {
        self.executors.get(kind_key).cloned()
    }

    #[must_use]
    pub fn contains(&self, kind_key: &Key) -> bool {
        self.executors.contains_key(kind_key)
    }

    pub fn unregister(&mut self, kind_key: &Key) -> Option<Arc<dyn NodeExecutor>> {
        self.executors.remove(kind_key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.executors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }

    pub fn kinds(&self) -> impl Iterator<Item = &Key> {
        self.executors.keys()
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("kinds", &self.executors.len())
            .finish()
    }
}
