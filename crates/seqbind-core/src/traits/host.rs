//! Host exclusivity lock.

/// The host runtime's exclusivity lock (an interpreter lock, an event loop
/// turn). Native code releases it around blocking sections so the host can
/// run other work, and must hold it again before touching host state.
pub trait HostLock: Send + Sync {
    fn release(&self);
    fn reacquire(&self);
}

/// Host without an exclusivity lock. Both operations are no-ops.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHostLock;

impl HostLock for NoHostLock {
    fn release(&self) {}
    fn reacquire(&self) {}
}

struct Reacquire<'a>(&'a dyn HostLock);

impl Drop for Reacquire<'_> {
    fn drop(&mut self) {
        self.0.reacquire();
    }
}

/// Run `f` with the host lock released. The lock is held again when this
/// returns, including when `f` unwinds.
pub fn suspended<R>(host: &dyn HostLock, f: impl FnOnce() -> R) -> R {
    host.release();
    let _guard = Reacquire(host);
    f()
}
