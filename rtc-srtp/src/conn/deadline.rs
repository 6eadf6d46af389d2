use std::time::Instant;
use tokio::sync::watch;

/// Deadline is a resettable point in time that blocked operations race
/// against. Updating it wakes every waiter so they re-arm with the new value.
pub(crate) struct Deadline {
    tx: watch::Sender<Option<Instant>>,
}

impl Deadline {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Deadline { tx }
    }

    pub(crate) fn set(&self, deadline: Option<Instant>) {
        self.tx.send_replace(deadline);
    }

    pub(crate) fn get(&self) -> Option<Instant> {
        *self.tx.borrow()
    }

    /// expired resolves once the current deadline has passed, following any
    /// update made while waiting. Never resolves while no deadline is set.
    pub(crate) async fn expired(&self) {
        let mut rx = self.tx.subscribe();
        loop {
            let deadline = *rx.borrow_and_update();
            match deadline {
                Some(at) => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(at.into()) => return,
                        _ = rx.changed() => {}
                    }
                }
                None => {
                    if rx.changed().await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
            }
        }
    }
}
