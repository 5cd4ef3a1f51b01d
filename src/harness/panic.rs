use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

static PANIC_HOOK_INSTALLED: Once = Once::new();

thread_local! {
    static CAPTURE_DEPTH: Cell<usize> = const { Cell::new(0) };
    static LAST_PANIC: RefCell<Option<PanicSite>> = const { RefCell::new(None) };
}

/// Where a captured panic happened
#[derive(Debug, Clone)]
pub struct PanicSite {
    /// `file:line:column` reported by the panic
    pub location: Option<String>,
    /// Rendered backtrace taken inside the hook
    pub backtrace: String,
}

/// Install a panic hook that records the panic site while a phase is being
/// captured on this thread.
///
/// Outside a capture the previously installed hook runs unchanged.
/// Safe to call multiple times - only installs once.
pub fn install_capture_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let default_hook = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CAPTURE_DEPTH.with(Cell::get) == 0 {
                default_hook(info);
                return;
            }
            let site = PanicSite {
                location: info.location().map(ToString::to_string),
                backtrace: Backtrace::force_capture().to_string(),
            };
            LAST_PANIC.with(|last| *last.borrow_mut() = Some(site));
        }));
    });
}

/// Site of the last panic captured on this thread, if not taken yet
pub fn take_last_panic() -> Option<PanicSite> {
    LAST_PANIC.with(|last| last.borrow_mut().take())
}

/// Run `f`, catching a panic and silencing its default report.
pub(crate) fn capture<F, T>(f: F) -> std::thread::Result<T>
where
    F: FnOnce() -> T,
{
    install_capture_hook();
    take_last_panic();

    CAPTURE_DEPTH.with(|depth| depth.set(depth.get() + 1));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    CAPTURE_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    result
}
