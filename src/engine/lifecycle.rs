//! Process-lifetime gate around the shell subsystem (`CoInitialize` /
//! `CoUninitialize` on Windows).

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::engine::service::ShellLinkService;
use crate::error::ResolveError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GateState {
    Uninitialized,
    Initialized,
}

/// Held by a resolution for the duration of its platform calls; teardown
/// takes the write side and therefore waits for in-flight resolutions.
///
/// The caller that performed the initialization keeps the write side, so
/// there is never an unlocked window between initializing and being
/// guarded.
#[derive(Debug)]
pub struct GateGuard<'a>(#[allow(dead_code)] Hold<'a>);

#[derive(Debug)]
enum Hold<'a> {
    Read(RwLockReadGuard<'a, GateState>),
    Write(RwLockWriteGuard<'a, GateState>),
}

/// Initialize-once gate for the platform subsystem.
///
/// Only success is latched: a failed initialization leaves the gate
/// uninitialized so the next resolution retries. Teardown releases the
/// subsystem at most once, and only if an initialization ever succeeded.
pub struct ComGate {
    state: RwLock<GateState>,
}

impl ComGate {
    pub fn new() -> Self {
        ComGate {
            state: RwLock::new(GateState::Uninitialized),
        }
    }

    /// Idempotent ensure-initialized. Returns a guard proving the
    /// subsystem is up; the caller holds it across its platform calls.
    pub fn acquire<'a>(
        &'a self,
        service: &dyn ShellLinkService,
    ) -> Result<GateGuard<'a>, ResolveError> {
        {
            let state = read_lock(&self.state);
            if *state == GateState::Initialized {
                return Ok(GateGuard(Hold::Read(state)));
            }
        }
        let mut state = write_lock(&self.state);
        // Double-check: another thread may have won the write race.
        if *state != GateState::Initialized {
            service
                .initialize()
                .map_err(|status| ResolveError::SubsystemInit { status })?;
            log::debug!("shell subsystem initialized");
            *state = GateState::Initialized;
        }
        // The write guard travels with the caller; later resolutions take
        // the read side.
        Ok(GateGuard(Hold::Write(state)))
    }

    /// Releases the subsystem if (and only if) an initialization succeeded.
    /// Safe to call when nothing was ever resolved, and safe to call twice.
    pub fn teardown(&self, service: &dyn ShellLinkService) {
        let mut state = write_lock(&self.state);
        if *state == GateState::Initialized {
            service.uninitialize();
            *state = GateState::Uninitialized;
            log::debug!("shell subsystem released");
        }
    }
}

impl Default for ComGate {
    fn default() -> Self {
        Self::new()
    }
}

// State transitions stay valid even if a holder panicked, so poisoning is
// stripped rather than propagated.
fn read_lock(lock: &RwLock<GateState>) -> RwLockReadGuard<'_, GateState> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write_lock(lock: &RwLock<GateState>) -> RwLockWriteGuard<'_, GateState> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}
