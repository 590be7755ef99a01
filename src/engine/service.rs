//! The seam between the resolution engine and the platform shell.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Windows `HRESULT` status code. Negative values are failures.
pub type HResult = i32;

/// `E_NOINTERFACE` — reported when no calling-convention variant could be
/// acquired at all.
pub const E_NOINTERFACE: HResult = 0x8000_4002_u32 as HResult;

/// The two mutually exclusive calling conventions the shell-link service
/// can be addressed through. Selected fresh on every resolution, never
/// persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterfaceVariant {
    /// Unicode `IShellLinkW`, the feature-complete interface.
    Wide,
    /// ANSI `IShellLinkA`, kept for platform instances without the wide one.
    Narrow,
}

impl InterfaceVariant {
    /// Acquisition order: wide first, narrow as the fallback.
    pub const PREFERENCE: [InterfaceVariant; 2] =
        [InterfaceVariant::Wide, InterfaceVariant::Narrow];
}

/// Window handle the shell may use to prompt the user when a target has
/// moved and cannot be found automatically.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UiContext {
    pub hwnd: isize,
}

/// Cooperative abort flag shared with the host's operation-abort mechanism.
///
/// Checked once on entry to a resolution; the blocking shell call itself is
/// not interruptible, so flipping the flag mid-call only takes effect on
/// the next request.
#[derive(Clone, Debug, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Platform shell-link resolution capability.
///
/// On Windows this is backed by COM (`crate::com::shell_link`); tests drive
/// the engine through scripted implementations.
pub trait ShellLinkService {
    /// One-shot subsystem initialization (`CoInitialize`). Called at most
    /// once per process unless it fails, in which case the engine retries
    /// on the next resolution.
    fn initialize(&self) -> Result<(), HResult>;

    /// Releases the subsystem (`CoUninitialize`). Only called after a
    /// successful `initialize`.
    fn uninitialize(&self);

    /// Acquires a resolution session for one calling-convention variant.
    /// Failure here (for any reason) makes the engine move on to the next
    /// variant in preference order.
    fn acquire(&self, variant: InterfaceVariant) -> Result<Box<dyn LinkSession + '_>, HResult>;

    /// Best-effort short-form to long-form path expansion. `None` means
    /// unavailable; the caller keeps the short form.
    fn expand_long_path(&self, short_path: &str) -> Option<String>;
}

/// The four-step protocol both interface variants expose. Steps must run
/// in order; any failure is fatal to the resolution attempt.
pub trait LinkSession {
    /// Step (a): acquire the persistence capability (`IPersistFile`).
    fn acquire_persist(&mut self) -> Result<(), HResult>;

    /// Step (b): load the shortcut file read-only through the persistence
    /// capability.
    fn load(&mut self, link_path: &str) -> Result<(), HResult>;

    /// Step (c): resolve the link. Without a UI context the shell is told
    /// to stay silent (`SLR_NO_UI`); with one it may prompt the user.
    fn resolve(&mut self, ui: Option<UiContext>) -> Result<(), HResult>;

    /// Step (d): retrieve the target as a short-form path. The find-data
    /// metadata the shell returns alongside is accepted and dropped.
    fn target_path(&mut self) -> Result<String, HResult>;
}
