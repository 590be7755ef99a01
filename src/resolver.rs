//! Host-facing resolver: extension match, local-scheme gate, and the
//! shutdown hook the host wires into its exit sequence.

use crate::engine::service::{AbortSignal, ShellLinkService, UiContext};
use crate::engine::ResolutionEngine;
use crate::error::ResolveError;

/// Extension this resolver registers for, matched case-insensitively.
pub const SHORTCUT_EXTENSION: &str = "lnk";

/// Component identity, surfaced to the host's about/version listing.
pub const COMPONENT_NAME: &str = "Shell Link Resolver";
pub const COMPONENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Behavior knobs for the resolver.
#[derive(Clone, Copy, Debug)]
pub struct ResolverOptions {
    /// When `false`, the shell is never allowed to prompt, even if the
    /// caller supplies a window. Defaults to `true`; headless hosts turn
    /// it off.
    pub allow_ui: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        ResolverOptions { allow_ui: true }
    }
}

/// The registry-facing shortcut resolver.
///
/// `supports` answers the registry's extension probe; `resolve` does the
/// work; `shutdown` is handed to the host's exit hook.
pub struct LinkResolver<S: ShellLinkService> {
    engine: ResolutionEngine<S>,
    options: ResolverOptions,
}

impl<S: ShellLinkService> LinkResolver<S> {
    pub fn new(service: S) -> Self {
        Self::with_options(service, ResolverOptions::default())
    }

    pub fn with_options(service: S, options: ResolverOptions) -> Self {
        LinkResolver {
            engine: ResolutionEngine::new(service),
            options,
        }
    }

    /// Case-insensitive extension match against [`SHORTCUT_EXTENSION`].
    pub fn supports(&self, extension: &str) -> bool {
        extension.eq_ignore_ascii_case(SHORTCUT_EXTENSION)
    }

    /// Resolves a `file://` URI naming a shortcut to its target's absolute
    /// path.
    ///
    /// The abort signal is checked on entry only; the blocking shell call
    /// is not interruptible once started. Non-`file://` inputs are
    /// rejected before any platform interaction.
    pub fn resolve(
        &self,
        path: &str,
        ui: Option<UiContext>,
        abort: &AbortSignal,
    ) -> Result<String, ResolveError> {
        if abort.is_aborted() {
            return Err(ResolveError::Aborted);
        }
        let link_path = local_path_of(path).ok_or_else(|| ResolveError::NonLocalTarget {
            path: path.to_string(),
        })?;
        let ui = if self.options.allow_ui { ui } else { None };
        self.engine.resolve(link_path, ui)
    }

    /// Host shutdown hook; see [`ResolutionEngine::shutdown`].
    pub fn shutdown(&self) {
        self.engine.shutdown();
    }

    pub fn service(&self) -> &S {
        self.engine.service()
    }
}

#[cfg(windows)]
pub type PlatformLinkResolver = LinkResolver<crate::com::shell_link::ComShellLinkService>;

#[cfg(windows)]
impl Default for PlatformLinkResolver {
    fn default() -> Self {
        LinkResolver::new(crate::com::shell_link::ComShellLinkService)
    }
}

/// Strips the local-filesystem scheme, yielding the native path.
///
/// Accepts both the host's `file://C:\...` form and the RFC 8089
/// `file:///C:/...` form, where an empty authority leaves a spurious slash
/// in front of the drive letter.
fn local_path_of(uri: &str) -> Option<&str> {
    let rest = strip_prefix_ignore_case(uri, "file://")?;
    let bytes = rest.as_bytes();
    if bytes.len() >= 3 && bytes[0] == b'/' && bytes[1].is_ascii_alphabetic() && bytes[2] == b':' {
        return Some(&rest[1..]);
    }
    Some(rest)
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
    {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}
