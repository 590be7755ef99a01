//! End-to-end resolver tests over a scripted shell service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use lnk_resolver::{
    AbortSignal, HResult, InterfaceVariant, LinkResolver, LinkSession, ResolveError,
    ResolverOptions, ShellLinkService, UiContext,
};

const E_FAIL: HResult = 0x8000_4005_u32 as HResult;
const E_NOINTERFACE: HResult = 0x8000_4002_u32 as HResult;
const STG_E_FILENOTFOUND: HResult = 0x8003_0002_u32 as HResult;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A link on the fake filesystem: short-form target, or `None` when the
/// target no longer exists (resolution fails).
type LinkTable = HashMap<String, Option<String>>;

#[derive(Default)]
struct FakeShell {
    wide_available: bool,
    fail_inits: AtomicUsize,
    links: LinkTable,
    long_forms: HashMap<String, String>,
    init_calls: AtomicUsize,
    uninit_calls: AtomicUsize,
    acquired: Mutex<Vec<InterfaceVariant>>,
    resolved_with_ui: Mutex<Vec<bool>>,
}

impl FakeShell {
    fn new() -> Self {
        FakeShell {
            wide_available: true,
            ..Default::default()
        }
    }

    fn with_link(mut self, link: &str, target: &str) -> Self {
        self.links.insert(link.into(), Some(target.into()));
        self
    }

    fn with_dangling_link(mut self, link: &str) -> Self {
        self.links.insert(link.into(), None);
        self
    }

    fn with_long_form(mut self, short: &str, long: &str) -> Self {
        self.long_forms.insert(short.into(), long.into());
        self
    }

    fn narrow_only(mut self) -> Self {
        self.wide_available = false;
        self
    }

    fn failing_first_init(self) -> Self {
        self.fail_inits.store(1, Ordering::SeqCst);
        self
    }

    fn acquired(&self) -> Vec<InterfaceVariant> {
        self.acquired.lock().unwrap().clone()
    }
}

impl ShellLinkService for FakeShell {
    fn initialize(&self) -> Result<(), HResult> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.fail_inits.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_inits.store(remaining - 1, Ordering::SeqCst);
            return Err(E_FAIL);
        }
        Ok(())
    }

    fn uninitialize(&self) {
        self.uninit_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn acquire(&self, variant: InterfaceVariant) -> Result<Box<dyn LinkSession + '_>, HResult> {
        self.acquired.lock().unwrap().push(variant);
        if variant == InterfaceVariant::Wide && !self.wide_available {
            return Err(E_NOINTERFACE);
        }
        Ok(Box::new(FakeSession {
            shell: self,
            target: None,
        }))
    }

    fn expand_long_path(&self, short_path: &str) -> Option<String> {
        self.long_forms.get(short_path).cloned()
    }
}

struct FakeSession<'a> {
    shell: &'a FakeShell,
    target: Option<Option<String>>,
}

impl LinkSession for FakeSession<'_> {
    fn acquire_persist(&mut self) -> Result<(), HResult> {
        Ok(())
    }

    fn load(&mut self, link_path: &str) -> Result<(), HResult> {
        match self.shell.links.get(link_path) {
            Some(target) => {
                self.target = Some(target.clone());
                Ok(())
            }
            None => Err(STG_E_FILENOTFOUND),
        }
    }

    fn resolve(&mut self, ui: Option<UiContext>) -> Result<(), HResult> {
        self.shell.resolved_with_ui.lock().unwrap().push(ui.is_some());
        match self.target {
            Some(Some(_)) => Ok(()),
            // Target gone; the real shell fails here when it may not prompt.
            _ => Err(E_FAIL),
        }
    }

    fn target_path(&mut self) -> Result<String, HResult> {
        match &self.target {
            Some(Some(target)) => Ok(target.clone()),
            _ => Err(E_FAIL),
        }
    }
}

#[test]
fn resolves_local_uri_to_target() {
    init_logs();
    let shell = FakeShell::new().with_link(
        "C:/Users/Test/Desktop/app.lnk",
        "C:/Program Files/App/app.exe",
    );
    let resolver = LinkResolver::new(shell);

    let target = resolver
        .resolve(
            "file:///C:/Users/Test/Desktop/app.lnk",
            None,
            &AbortSignal::new(),
        )
        .unwrap();

    assert_eq!(target, "C:/Program Files/App/app.exe");
    assert_eq!(resolver.service().acquired(), vec![InterfaceVariant::Wide]);
}

#[test]
fn rejects_non_local_scheme_without_touching_the_shell() {
    let resolver = LinkResolver::new(FakeShell::new());

    let err = resolver
        .resolve("http://example.com/app.lnk", None, &AbortSignal::new())
        .unwrap_err();

    assert!(matches!(err, ResolveError::NonLocalTarget { .. }));
    assert_eq!(resolver.service().init_calls.load(Ordering::SeqCst), 0);
    assert!(resolver.service().acquired().is_empty());
}

#[test]
fn missing_target_fails_resolution() {
    let shell = FakeShell::new().with_dangling_link("C:\\stale.lnk");
    let resolver = LinkResolver::new(shell);

    let err = resolver
        .resolve("file://C:\\stale.lnk", None, &AbortSignal::new())
        .unwrap_err();

    assert!(matches!(err, ResolveError::Resolution { status } if status == E_FAIL));
}

#[test]
fn unreadable_link_fails_load() {
    let resolver = LinkResolver::new(FakeShell::new());

    let err = resolver
        .resolve("file://C:\\absent.lnk", None, &AbortSignal::new())
        .unwrap_err();

    assert!(matches!(err, ResolveError::Load { status } if status == STG_E_FILENOTFOUND));
}

#[test]
fn short_form_is_kept_when_expansion_is_unavailable() {
    let shell = FakeShell::new().with_link("C:\\app.lnk", "C:/PROGRA~1/App/app.exe");
    let resolver = LinkResolver::new(shell);

    let target = resolver
        .resolve("file://C:\\app.lnk", None, &AbortSignal::new())
        .unwrap();

    assert_eq!(target, "C:/PROGRA~1/App/app.exe");
}

#[test]
fn short_form_is_expanded_when_possible() {
    let shell = FakeShell::new()
        .with_link("C:\\app.lnk", "C:/PROGRA~1/App/app.exe")
        .with_long_form("C:/PROGRA~1/App/app.exe", "C:/Program Files/App/app.exe");
    let resolver = LinkResolver::new(shell);

    let target = resolver
        .resolve("file://C:\\app.lnk", None, &AbortSignal::new())
        .unwrap();

    assert_eq!(target, "C:/Program Files/App/app.exe");
}

#[test]
fn falls_back_to_narrow_interface_with_equivalent_result() {
    init_logs();
    let wide = LinkResolver::new(
        FakeShell::new().with_link("C:\\app.lnk", "C:\\App\\app.exe"),
    );
    let narrow = LinkResolver::new(
        FakeShell::new()
            .narrow_only()
            .with_link("C:\\app.lnk", "C:\\App\\app.exe"),
    );
    let abort = AbortSignal::new();

    let via_wide = wide.resolve("file://C:\\app.lnk", None, &abort).unwrap();
    let via_narrow = narrow.resolve("file://C:\\app.lnk", None, &abort).unwrap();

    assert_eq!(via_wide, via_narrow);
    assert_eq!(
        narrow.service().acquired(),
        vec![InterfaceVariant::Wide, InterfaceVariant::Narrow]
    );
}

#[test]
fn narrow_branch_failure_is_final() {
    let shell = FakeShell::new().narrow_only(); // no links: narrow load fails
    let resolver = LinkResolver::new(shell);

    let err = resolver
        .resolve("file://C:\\app.lnk", None, &AbortSignal::new())
        .unwrap_err();

    // Load failed in the narrow branch; no further variant was tried.
    assert!(matches!(err, ResolveError::Load { .. }));
    assert_eq!(
        resolver.service().acquired(),
        vec![InterfaceVariant::Wide, InterfaceVariant::Narrow]
    );
}

#[test]
fn initializes_once_and_tears_down_once() {
    let shell = FakeShell::new().with_link("C:\\app.lnk", "C:\\App\\app.exe");
    let resolver = LinkResolver::new(shell);
    let abort = AbortSignal::new();

    for _ in 0..3 {
        resolver.resolve("file://C:\\app.lnk", None, &abort).unwrap();
    }
    resolver.shutdown();
    resolver.shutdown();

    assert_eq!(resolver.service().init_calls.load(Ordering::SeqCst), 1);
    assert_eq!(resolver.service().uninit_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn shutdown_without_any_resolution_is_a_noop() {
    let resolver = LinkResolver::new(FakeShell::new());
    resolver.shutdown();
    assert_eq!(resolver.service().uninit_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn failed_initialization_is_retried_on_the_next_call() {
    let shell = FakeShell::new()
        .failing_first_init()
        .with_link("C:\\app.lnk", "C:\\App\\app.exe");
    let resolver = LinkResolver::new(shell);
    let abort = AbortSignal::new();

    let err = resolver.resolve("file://C:\\app.lnk", None, &abort).unwrap_err();
    assert!(matches!(err, ResolveError::SubsystemInit { status } if status == E_FAIL));
    assert_eq!(err.status(), Some(E_FAIL));

    let target = resolver.resolve("file://C:\\app.lnk", None, &abort).unwrap();
    assert_eq!(target, "C:\\App\\app.exe");
    assert_eq!(resolver.service().init_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn aborted_signal_stops_resolution_at_entry() {
    let resolver = LinkResolver::new(FakeShell::new());
    let abort = AbortSignal::new();
    abort.abort();

    let err = resolver
        .resolve("file://C:\\app.lnk", None, &abort)
        .unwrap_err();

    assert!(matches!(err, ResolveError::Aborted));
    assert_eq!(resolver.service().init_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn ui_context_reaches_the_shell_by_default() {
    let shell = FakeShell::new().with_link("C:\\app.lnk", "C:\\App\\app.exe");
    let resolver = LinkResolver::new(shell);

    resolver
        .resolve(
            "file://C:\\app.lnk",
            Some(UiContext { hwnd: 0x1234 }),
            &AbortSignal::new(),
        )
        .unwrap();

    assert_eq!(*resolver.service().resolved_with_ui.lock().unwrap(), vec![true]);
}

#[test]
fn ui_is_suppressed_when_disallowed_by_options() {
    let shell = FakeShell::new().with_link("C:\\app.lnk", "C:\\App\\app.exe");
    let resolver = LinkResolver::with_options(shell, ResolverOptions { allow_ui: false });

    resolver
        .resolve(
            "file://C:\\app.lnk",
            Some(UiContext { hwnd: 0x1234 }),
            &AbortSignal::new(),
        )
        .unwrap();

    assert_eq!(*resolver.service().resolved_with_ui.lock().unwrap(), vec![false]);
}
