//! Backend seam: service traits and an in-memory implementation

pub mod memory;
pub mod traits;

use std::sync::Arc;

pub use memory::InMemoryBackend;
pub use traits::{
    FillService, HierarchyHandle, MetaService, TimeseriesService, VariableStatistics,
    VectorElements,
};

/// The three service handles the client depends on
#[derive(Clone)]
pub struct Services {
    /// Variable namespace and hierarchy
    pub meta: Arc<dyn MetaService>,
    /// Sample retrieval
    pub timeseries: Arc<dyn TimeseriesService>,
    /// Fill timeline
    pub fills: Arc<dyn FillService>,
}

impl Services {
    /// Bundle independent service handles
    pub fn new(
        meta: Arc<dyn MetaService>,
        timeseries: Arc<dyn TimeseriesService>,
        fills: Arc<dyn FillService>,
    ) -> Self {
        Self {
            meta,
            timeseries,
            fills,
        }
    }

    /// Use one backend object for all three services
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: MetaService + TimeseriesService + FillService + 'static,
    {
        Self {
            meta: backend.clone(),
            timeseries: backend.clone(),
            fills: backend,
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
