//! Cancellable one-shot timers keyed by guild, message or whatever else
//! the bots need to expire.

use std::{future::Future, hash::Hash, sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::task::AbortHandle;

struct Pending {
    generation: u64,
    handle: AbortHandle,
}

/// A registry of at most one pending timer per key.
///
/// Scheduling a key that already has a pending timer aborts the old one.
/// A timer that fires removes its own entry before running its action, so
/// the action is free to schedule the same key again.
pub struct Timers<K: Eq + Hash> {
    pending: Arc<DashMap<K, Pending>>,
    next_generation: std::sync::atomic::AtomicU64,
}

impl<K> Default for Timers<K>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            next_generation: Default::default(),
        }
    }
}

impl<K> Timers<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    pub fn schedule<F>(&self, key: K, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self
            .next_generation
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let pending = self.pending.clone();
        let task_key = key.clone();

        // Hold the entry lock while spawning so the task cannot observe a
        // missing entry before it is inserted.
        let entry = self.pending.entry(key);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let ours = pending
                .remove_if(&task_key, |_, p| p.generation == generation)
                .is_some();
            if ours {
                action.await;
            }
        });

        let new = Pending {
            generation,
            handle: task.abort_handle(),
        };
        match entry {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                occupied.get().handle.abort();
                occupied.insert(new);
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(new);
            }
        }
    }

    /// Aborts the pending timer for `key`. Returns whether one was pending.
    pub fn cancel(&self, key: &K) -> bool {
        match self.pending.remove(key) {
            Some((_, p)) => {
                p.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }
}

impl<K: Eq + Hash> Drop for Timers<K> {
    fn drop(&mut self) {
        for p in self.pending.iter() {
            p.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> std::pin::Pin<Box<dyn Future<Output = ()> + Send>>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let make = move || {
            let c = c.clone();
            Box::pin(async move {
                c.fetch_add(1, Ordering::SeqCst);
            }) as std::pin::Pin<Box<dyn Future<Output = ()> + Send>>
        };
        (count, make)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay_and_clears_entry() {
        let timers = Timers::default();
        let (count, make) = counter();

        timers.schedule(1u64, Duration::from_secs(5), make());
        assert!(timers.is_pending(&1));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!timers.is_pending(&1));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let timers = Timers::default();
        let (count, make) = counter();

        timers.schedule("guild", Duration::from_secs(5), make());
        assert!(timers.cancel(&"guild"));
        assert!(!timers.cancel(&"guild"));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_pending_timer() {
        let timers = Timers::default();
        let (count, make) = counter();

        timers.schedule(7u8, Duration::from_secs(5), make());
        tokio::time::sleep(Duration::from_secs(3)).await;
        timers.schedule(7u8, Duration::from_secs(5), make());

        // the first deadline passes without firing
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(timers.is_pending(&7));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_independent() {
        let timers = Timers::default();
        let (count, make) = counter();

        timers.schedule(1u64, Duration::from_secs(1), make());
        timers.schedule(2u64, Duration::from_secs(1), make());
        timers.cancel(&1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
