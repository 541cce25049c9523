pub mod calendar;
pub mod config;
pub mod goal;
pub mod maintenance;
pub mod session;

use std::error::Error;
use std::sync::Arc;

use regrow_core::clock;
use regrow_core::{
    startup_sweep, Config, GoalRegistry, SessionManager, SharedClock, SharedStore, Store,
    SweepReport,
};

/// Config, store and clock shared by the store-backed commands.
pub struct Context {
    pub config: Config,
    pub store: SharedStore,
    pub clock: SharedClock,
}

impl Context {
    /// Open the store and run the startup sweep.
    pub fn open() -> Result<Self, Box<dyn Error>> {
        let ctx = Self::open_unswept()?;
        ctx.sweep();
        Ok(ctx)
    }

    pub fn open_unswept() -> Result<Self, Box<dyn Error>> {
        let config = Config::load()?;
        let store = Store::open(&config.storage.db_file)?.shared();
        Ok(Self {
            config,
            store,
            clock: clock::system(),
        })
    }

    pub fn sweep(&self) -> SweepReport {
        startup_sweep(
            &self.store,
            self.clock.as_ref(),
            self.config.retention_policy(),
        )
    }

    pub fn registry(&self) -> Arc<GoalRegistry> {
        Arc::new(GoalRegistry::new(self.store.clone(), self.clock.clone()))
    }

    pub fn manager(&self) -> SessionManager {
        SessionManager::new(self.store.clone(), self.clock.clone())
    }
}
