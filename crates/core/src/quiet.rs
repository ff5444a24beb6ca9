//! Scoped suppression of model diagnostics.
//!
//! Fitting emits a stream of per-iteration trace events. Batch runs wrap each
//! model invocation in [`silenced`], which installs a no-op dispatcher for the
//! current thread only and restores the previous one when the closure returns
//! or unwinds.

use tracing::subscriber::NoSubscriber;

/// Run `f` with all tracing output on this thread discarded.
pub fn silenced<T>(f: impl FnOnce() -> T) -> T {
    tracing::subscriber::with_default(NoSubscriber::default(), f)
}

/// Run `f` silenced when `quiet` is set, otherwise unchanged.
pub fn silenced_if<T>(quiet: bool, f: impl FnOnce() -> T) -> T {
    if quiet {
        silenced(f)
    } else {
        f()
    }
}
