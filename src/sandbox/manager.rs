/*!
 * Sandbox Manager
 * Host-side registry of isolated instances
 */

use super::config::SandboxConfig;
use super::instance::Sandbox;
use super::types::SandboxStats;
use crate::core::errors::{SandboxError, SandboxResult};
use crate::core::types::SandboxId;
use crate::engine::{EngineResult, ScriptEngine, Value};
use crate::memory::AllocationGuard;
use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

/// Shared handle to a managed instance
pub type SandboxHandle<E> = Arc<Mutex<Sandbox<E>>>;

/// Registry of sandboxes
///
/// Instances never share ledgers, buffers or module caches; each call locks
/// only the instance it targets.
pub struct SandboxManager<E: ScriptEngine> {
    sandboxes: Arc<DashMap<SandboxId, SandboxHandle<E>, RandomState>>,
}

impl<E: ScriptEngine> Clone for SandboxManager<E> {
    fn clone(&self) -> Self {
        Self {
            sandboxes: Arc::clone(&self.sandboxes),
        }
    }
}

impl<E: ScriptEngine> Default for SandboxManager<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ScriptEngine> SandboxManager<E> {
    pub fn new() -> Self {
        info!("Sandbox manager initialized");
        Self {
            sandboxes: Arc::new(DashMap::with_hasher(RandomState::new())),
        }
    }

    /// Create, initialize and register a sandbox
    pub fn provision<F>(&self, config: SandboxConfig, factory: F) -> SandboxResult<SandboxId>
    where
        F: FnOnce(AllocationGuard) -> EngineResult<E>,
    {
        let mut sandbox = Sandbox::create(config, factory)?;
        sandbox.init()?;
        let id = sandbox.id();
        self.sandboxes.insert(id, Arc::new(Mutex::new(sandbox)));
        Ok(id)
    }

    pub fn get(&self, id: SandboxId) -> Option<SandboxHandle<E>> {
        self.sandboxes.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    fn handle(&self, id: SandboxId) -> SandboxResult<SandboxHandle<E>> {
        self.get(id).ok_or(SandboxError::NotFound(id))
    }

    /// Call a function in one instance
    pub fn call(&self, id: SandboxId, function: &str, args: &[Value]) -> SandboxResult<Value> {
        self.handle(id)?.lock().call(function, args)
    }

    pub fn take_output(&self, id: SandboxId) -> SandboxResult<Vec<u8>> {
        self.handle(id)?.lock().take_output()
    }

    /// Terminate and unregister; returns whether the instance existed
    pub fn terminate(&self, id: SandboxId) -> bool {
        match self.sandboxes.remove(&id) {
            Some((_, sandbox)) => {
                sandbox.lock().terminate();
                true
            }
            None => false,
        }
    }

    pub fn terminate_all(&self) -> usize {
        let ids: Vec<SandboxId> = self.sandboxes.iter().map(|entry| *entry.key()).collect();
        ids.into_iter().filter(|id| self.terminate(*id)).count()
    }

    pub fn stats(&self, id: SandboxId) -> Option<SandboxStats> {
        self.get(id).map(|sandbox| sandbox.lock().stats())
    }

    pub fn all_stats(&self) -> Vec<SandboxStats> {
        let mut stats: Vec<SandboxStats> = self
            .sandboxes
            .iter()
            .map(|entry| entry.value().lock().stats())
            .collect();
        stats.sort_by_key(|s| s.id);
        stats
    }

    pub fn len(&self) -> usize {
        self.sandboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sandboxes.is_empty()
    }
}
