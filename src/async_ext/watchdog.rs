//! Client-side watchdog for loading states.
//!
//! No completion signal is pushed by the backend, so a loading screen bounds
//! its own wait: after a fixed delay it switches to a "taking longer than
//! expected" state offering a manual reload.

use core::future::Future;
use core::time::Duration;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Delay before a loading state is considered slow.
pub const SLOW_LOADING_AFTER: Duration = Duration::from_secs(15);

/// Message shown once loading is slow.
pub const SLOW_LOADING_MESSAGE: &str = "Le chargement prend plus de temps que prévu.";

/// Label of the manual reload action offered once loading is slow.
pub const RELOAD_LABEL: &str = "Actualiser la page";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingState {
    Loading,
    Slow,
    Done,
}

/// Tracks one loading state and flips it to [`LoadingState::Slow`] after a delay.
///
/// Dropping the watchdog stops its timer.
#[derive(Debug)]
pub struct LoadingWatchdog {
    state: Arc<watch::Sender<LoadingState>>,
    timer: JoinHandle<()>,
}

impl LoadingWatchdog {
    /// Starts the timer. Must be called within a tokio runtime.
    pub fn start(after: Duration) -> Self {
        let (state, _) = watch::channel(LoadingState::Loading);
        let state = Arc::new(state);
        let timer_state = Arc::clone(&state);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            timer_state.send_if_modified(|current| match current {
                LoadingState::Loading => {
                    *current = LoadingState::Slow;
                    true
                },
                _ => false,
            });
        });
        Self { state, timer }
    }

    #[inline]
    pub fn state(&self) -> LoadingState {
        *self.state.borrow()
    }

    #[inline]
    pub fn is_slow(&self) -> bool {
        self.state() == LoadingState::Slow
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<LoadingState> {
        self.state.subscribe()
    }

    /// Marks loading as finished and stops the timer.
    pub fn finish(&self) {
        self.timer.abort();
        self.state.send_replace(LoadingState::Done);
    }
}

impl Drop for LoadingWatchdog {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

/// Awaits `future`, calling `on_slow` once if it outlives `after`.
pub async fn watch_loading<Fut, F>(future: Fut, after: Duration, on_slow: F) -> Fut::Output
where
    Fut: Future,
    F: FnOnce(),
{
    tokio::pin!(future);
    tokio::select! {
        output = &mut future => output,
        () = tokio::time::sleep(after) => {
            tracing::warn!(after = ?after, "loading is taking longer than expected");
            on_slow();
            future.await
        }
    }
}
