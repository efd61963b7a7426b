//! Dispatch from (operation, backend) to implementation.
//!
//! The built-in registry is created on first use. Registration replaces any
//! previous entry; lookups for the memory backend fall back to the built-in
//! reference implementation, other backends fail with
//! [`ProfileError::UnregisteredBackend`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use tracing::debug;

use crate::backends::{memory, DescribeOp, Describer, TableAggregator};
use crate::capabilities;
use crate::error::{ProfileError, ProfileResult};
use crate::frame::BackendKind;

/// Describers and aggregators by backend.
#[derive(Debug, Clone, Default)]
pub struct DispatchRegistry {
    describers: HashMap<(DescribeOp, BackendKind), Arc<dyn Describer>>,
    aggregators: HashMap<BackendKind, Arc<dyn TableAggregator>>,
}

impl DispatchRegistry {
    /// A registry without any implementation.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with every available backend registered.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        memory::register(&mut registry);
        #[cfg(feature = "cluster")]
        if capabilities::is_available(BackendKind::Cluster) {
            crate::backends::cluster::register(&mut registry);
        }
        #[cfg(feature = "lazy")]
        if capabilities::is_available(BackendKind::Lazy) {
            crate::backends::lazy::register(&mut registry);
        }
        debug!(
            describers = registry.describers.len(),
            aggregators = registry.aggregators.len(),
            "built-in backends registered"
        );
        registry
    }

    /// Registers `describer`, returning the implementation it replaces.
    pub fn register_describer(
        &mut self,
        op: DescribeOp,
        backend: BackendKind,
        describer: Arc<dyn Describer>,
    ) -> Option<Arc<dyn Describer>> {
        self.describers.insert((op, backend), describer)
    }

    /// Registers `aggregator` for its backend, returning the one it replaces.
    pub fn register_aggregator(
        &mut self,
        aggregator: Arc<dyn TableAggregator>,
    ) -> Option<Arc<dyn TableAggregator>> {
        self.aggregators.insert(aggregator.backend(), aggregator)
    }

    pub fn describer(&self, op: DescribeOp, backend: BackendKind) -> ProfileResult<Arc<dyn Describer>> {
        match self.describers.get(&(op, backend)) {
            Some(describer) => Ok(Arc::clone(describer)),
            None if backend == BackendKind::Memory => Ok(memory::reference_describer(op)),
            None => Err(ProfileError::UnregisteredBackend {
                operation: op.name().to_string(),
                backend,
            }),
        }
    }

    pub fn aggregator(&self, backend: BackendKind) -> ProfileResult<Arc<dyn TableAggregator>> {
        match self.aggregators.get(&backend) {
            Some(aggregator) => Ok(Arc::clone(aggregator)),
            None if backend == BackendKind::Memory => Ok(memory::reference_aggregator()),
            None => Err(ProfileError::UnregisteredBackend {
                operation: "table aggregation".to_string(),
                backend,
            }),
        }
    }

    /// Returns true if `op` has an explicit registration for `backend`.
    pub fn is_registered(&self, op: DescribeOp, backend: BackendKind) -> bool {
        self.describers.contains_key(&(op, backend))
    }
}

static GLOBAL: Lazy<RwLock<Arc<DispatchRegistry>>> =
    Lazy::new(|| RwLock::new(Arc::new(DispatchRegistry::with_builtin())));

/// Snapshot of the process-wide registry.
pub fn global() -> ProfileResult<Arc<DispatchRegistry>> {
    let guard = GLOBAL
        .read()
        .map_err(|_| ProfileError::execution("dispatch registry lock poisoned"))?;
    Ok(Arc::clone(&guard))
}

fn update<F>(change: F) -> ProfileResult<()>
where
    F: FnOnce(&mut DispatchRegistry),
{
    let mut guard = GLOBAL
        .write()
        .map_err(|_| ProfileError::execution("dispatch registry lock poisoned"))?;
    let mut next = DispatchRegistry::clone(&guard);
    change(&mut next);
    *guard = Arc::new(next);
    Ok(())
}

/// Registers a describer in the process-wide registry.
///
/// Runs already in progress keep the snapshot they started with.
pub fn register_describer(
    op: DescribeOp,
    backend: BackendKind,
    describer: Arc<dyn Describer>,
) -> ProfileResult<()> {
    update(|registry| {
        registry.register_describer(op, backend, describer);
    })
}

/// Registers a table aggregator in the process-wide registry.
pub fn register_aggregator(aggregator: Arc<dyn TableAggregator>) -> ProfileResult<()> {
    update(|registry| {
        registry.register_aggregator(aggregator);
    })
}
