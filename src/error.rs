use thiserror::Error;

use crate::engine::service::HResult;

/// Failures a resolution attempt can surface to the host registry.
///
/// Every variant that originates in a platform call carries the `HRESULT`
/// the shell returned, so callers can branch on the kind and still log the
/// raw status.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The input path does not use the local-filesystem scheme. Raised
    /// before any platform interaction.
    #[error("shortcut is not on local filesystem: {path}")]
    NonLocalTarget { path: String },

    /// One-time COM subsystem initialization failed. Not cached; the next
    /// resolution attempt retries.
    #[error("shell subsystem initialization failed (HRESULT {status:#010x})")]
    SubsystemInit { status: HResult },

    /// Neither the wide nor the narrow shell-link interface could be
    /// acquired or queried.
    #[error("no shell link interface could be acquired (HRESULT {status:#010x})")]
    InterfaceAcquisition { status: HResult },

    /// The shell could not open or parse the shortcut file.
    #[error("failed to load shortcut file (HRESULT {status:#010x})")]
    Load { status: HResult },

    /// The shell could not resolve the link to a target, e.g. the target
    /// is gone and no window was available to prompt the user.
    #[error("failed to resolve shortcut target (HRESULT {status:#010x})")]
    Resolution { status: HResult },

    /// Resolution succeeded but the target path could not be read back.
    #[error("resolved target path could not be retrieved (HRESULT {status:#010x})")]
    PathRetrieval { status: HResult },

    /// The host's abort signal was set when the resolution was requested.
    #[error("operation aborted by host")]
    Aborted,
}

impl ResolveError {
    /// Originating platform status code, where one exists.
    pub fn status(&self) -> Option<HResult> {
        match self {
            ResolveError::SubsystemInit { status }
            | ResolveError::InterfaceAcquisition { status }
            | ResolveError::Load { status }
            | ResolveError::Resolution { status }
            | ResolveError::PathRetrieval { status } => Some(*status),
            ResolveError::NonLocalTarget { .. } | ResolveError::Aborted => None,
        }
    }
}
