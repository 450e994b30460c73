//! Process-wide transport initialization gate.
//!
//! The transport's global init/deinit routines must run at most once each
//! per process regardless of how many connections are created. The gate is
//! a boolean under a lock, not a reference count: deinitialization happens
//! only on explicit request, never automatically when a connection closes.

use parking_lot::Mutex;
use peerlink_core::{error::Result, transport::TransportDriver};

/// A boolean init gate guarded by a mutual-exclusion lock.
#[derive(Debug)]
pub(crate) struct InitGate {
    initialized: Mutex<bool>,
}

impl InitGate {
    pub(crate) const fn new() -> Self {
        Self { initialized: Mutex::new(false) }
    }

    /// Runs `global_init` if it has not run yet. Failure leaves the gate
    /// open so a later attempt can retry.
    pub(crate) fn ensure(&self, driver: &dyn TransportDriver) -> Result<()> {
        let mut initialized = self.initialized.lock();
        if !*initialized {
            driver.global_init()?;
            *initialized = true;
        }
        Ok(())
    }

    /// Runs `global_deinit` if init has run, and re-arms the gate.
    pub(crate) fn teardown(&self, driver: &dyn TransportDriver) {
        let mut initialized = self.initialized.lock();
        if *initialized {
            driver.global_deinit();
            *initialized = false;
        }
    }
}

static GATE: InitGate = InitGate::new();

/// Ensures the transport's process-wide initialization has run exactly once.
///
/// Called by `Connection::create_host` before any host is attempted; also
/// callable directly for explicit bootstrapping.
pub fn ensure_initialized(driver: &dyn TransportDriver) -> Result<()> {
    GATE.ensure(driver)
}

/// Explicitly tears down the transport's process-wide state.
///
/// Callers are responsible for closing every connection first; the session
/// layer never invokes this on its own.
pub fn deinitialize(driver: &dyn TransportDriver) {
    GATE.teardown(driver)
}
