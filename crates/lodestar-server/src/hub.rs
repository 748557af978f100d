//! Snapshot publication and hot reload.
//!
//! Requests never see a table under construction: [`RouteHub::reload`] builds
//! a complete [`RoutingTable`] without holding any lock, then swaps it in
//! under a single write lock. Readers clone the current `Arc` and keep
//! using it for the whole request, even if a reload lands meanwhile.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::controller::ControllerDef;
use crate::error::LoadError;
use crate::loader::{LoadReport, RouteLoader};
use crate::routing::RoutingTable;

/// Holds the live routing table.
pub struct RouteHub {
    current: RwLock<Arc<RoutingTable>>,
    loader: RouteLoader,
    controllers: Vec<ControllerDef>,
    reload_lock: Mutex<()>,
}

impl RouteHub {
    /// Loads `controllers` and publishes the result.
    ///
    /// # Errors
    ///
    /// Fails when the initial load is fatal.
    pub fn new(loader: RouteLoader, controllers: Vec<ControllerDef>) -> Result<(Self, LoadReport), LoadError> {
        let (table, report) = loader.load(&controllers)?;
        let hub = Self {
            current: RwLock::new(Arc::new(table)),
            loader,
            controllers,
            reload_lock: Mutex::new(()),
        };
        Ok((hub, report))
    }

    /// The current table.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RoutingTable> {
        Arc::clone(&self.current.read())
    }

    /// Rebuilds the table from the controller set and swaps it in.
    ///
    /// Concurrent reloads are serialized. On a fatal load error the current
    /// table stays in place.
    ///
    /// # Errors
    ///
    /// Returns the fatal load error.
    pub fn reload(&self) -> Result<LoadReport, LoadError> {
        let _guard = self.reload_lock.lock();
        let (table, report) = self.loader.load(&self.controllers)?;
        *self.current.write() = Arc::new(table);
        tracing::info!(routes = report.routes_registered, "Routing table reloaded");
        Ok(report)
    }

    /// The controller set the hub loads from.
    #[must_use]
    pub fn controllers(&self) -> &[ControllerDef] {
        &self.controllers
    }
}

impl std::fmt::Debug for RouteHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteHub")
            .field("current", &*self.current.read())
            .field("controllers", &self.controllers.len())
            .finish_non_exhaustive()
    }
}
