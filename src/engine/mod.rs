//! The shortcut-resolution engine: subsystem lifecycle, interface-variant
//! fallback, the four-step resolution protocol, and short-to-long path
//! normalization.

pub mod lifecycle;
pub mod service;

use self::lifecycle::ComGate;
use self::service::{InterfaceVariant, LinkSession, ShellLinkService, UiContext, E_NOINTERFACE};

use crate::error::ResolveError;

/// Drives a [`ShellLinkService`] through one full resolution per call.
///
/// Nothing is cached between calls except the subsystem initialization,
/// which happens lazily at most once for the engine's lifetime.
pub struct ResolutionEngine<S: ShellLinkService> {
    service: S,
    gate: ComGate,
}

impl<S: ShellLinkService> ResolutionEngine<S> {
    pub fn new(service: S) -> Self {
        ResolutionEngine {
            service,
            gate: ComGate::new(),
        }
    }

    /// Resolves a local shortcut file (native path, scheme already
    /// stripped) to its target's absolute path.
    ///
    /// All-or-nothing: on any failure the error carries the originating
    /// platform status and no path is produced.
    pub fn resolve(&self, link_path: &str, ui: Option<UiContext>) -> Result<String, ResolveError> {
        let _com = self.gate.acquire(&self.service)?;

        let mut session = self.acquire_session()?;
        session
            .acquire_persist()
            .map_err(|status| ResolveError::InterfaceAcquisition { status })?;
        session
            .load(link_path)
            .map_err(|status| ResolveError::Load { status })?;
        session
            .resolve(ui)
            .map_err(|status| ResolveError::Resolution { status })?;
        let short_path = session
            .target_path()
            .map_err(|status| ResolveError::PathRetrieval { status })?;

        Ok(self.expand_or(short_path))
    }

    /// Tries each calling-convention variant in preference order. Only
    /// acquisition failures fall through to the next variant; once a
    /// session exists, its step failures are final.
    fn acquire_session(&self) -> Result<Box<dyn LinkSession + '_>, ResolveError> {
        let mut last_status = E_NOINTERFACE;
        for variant in InterfaceVariant::PREFERENCE {
            match self.service.acquire(variant) {
                Ok(session) => return Ok(session),
                Err(status) => {
                    log::debug!(
                        "{variant:?} shell link interface unavailable (HRESULT {status:#010x})"
                    );
                    last_status = status;
                }
            }
        }
        Err(ResolveError::InterfaceAcquisition {
            status: last_status,
        })
    }

    /// Expansion failure is not an error; the short form simply stands.
    fn expand_or(&self, short_path: String) -> String {
        match self.service.expand_long_path(&short_path) {
            Some(long_path) => long_path,
            None => {
                log::debug!("long path expansion unavailable for {short_path:?}, keeping short form");
                short_path
            }
        }
    }

    /// Host shutdown hook: releases the subsystem if it was ever
    /// initialized. No-op otherwise, no-op when repeated.
    pub fn shutdown(&self) {
        self.gate.teardown(&self.service);
    }

    pub fn service(&self) -> &S {
        &self.service
    }
}
