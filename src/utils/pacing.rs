use std::{
    sync::{Mutex, MutexGuard},
    thread,
    time::{Duration, Instant},
};

use tokio_util::sync::CancellationToken;

/// Longest stretch a worker sleeps before looking at its cancel token.
pub const CANCEL_POLL: Duration = Duration::from_millis(100);

/// Sleeps for `total`, waking at least every [`CANCEL_POLL`]. Returns `false`
/// if the token was cancelled first.
pub fn sleep_unless_cancelled(total: Duration, token: &CancellationToken) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if token.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(CANCEL_POLL));
    }
}

/// Locks `mutex`, taking the data even if a panicking thread poisoned it.
/// Worker panics are caught and cleaned up, so the state is still usable.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
