//! Shell link (`.lnk`) resolution for host file-resolution registries.
//!
//! A host application that treats `.lnk` files as pointers rather than
//! payloads registers a [`LinkResolver`] against the `lnk` extension. When
//! the host hands over a `file://` URI, the resolver asks the Windows shell
//! to resolve the link (preferring the Unicode `IShellLinkW` interface and
//! falling back to the ANSI `IShellLinkA` one), expands the short-form
//! result to its long form when possible, and returns the absolute target
//! path. COM is initialized lazily on the first resolution and released by
//! [`LinkResolver::shutdown`], which the host wires into its own shutdown
//! sequence.
//!
//! The shell itself sits behind the [`ShellLinkService`] trait, so the
//! engine and its contract are testable (and compile) on any platform; the
//! live COM backend is Windows-only.

pub mod engine;
pub mod error;
pub mod resolver;

#[cfg(windows)]
pub mod com;

pub use engine::service::{
    AbortSignal, HResult, InterfaceVariant, LinkSession, ShellLinkService, UiContext,
};
pub use engine::ResolutionEngine;
pub use error::ResolveError;
pub use resolver::{
    LinkResolver, ResolverOptions, COMPONENT_NAME, COMPONENT_VERSION, SHORTCUT_EXTENSION,
};

#[cfg(windows)]
pub use com::shell_link::ComShellLinkService;
#[cfg(windows)]
pub use resolver::PlatformLinkResolver;
