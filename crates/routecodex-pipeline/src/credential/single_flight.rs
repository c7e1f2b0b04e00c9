use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Coalesces concurrent callers keyed by `K` so that at most one of the
/// wrapped futures executes per key at a time. A completed result is cached
/// for `ttl` so callers that arrive while a refresh is in flight — or just
/// after it lands — observe the same outcome instead of repeating the work.
///
/// Used to guarantee at most one concurrent OAuth token refresh per
/// `(providerId, keyId)`.
pub struct SingleFlight<K, V> {
    slots: Mutex<HashMap<K, Arc<Mutex<Slot<V>>>>>,
    ttl: Duration,
}

struct Slot<V> {
    cached: Option<(Instant, V)>,
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Runs `f` for `key`, or returns the result of a call already in
    /// flight / freshly completed for the same key.
    pub async fn run<F, Fut>(&self, key: K, f: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots
                .entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(Slot { cached: None })))
                .clone()
        };

        let mut guard = slot.lock().await;
        if let Some((at, value)) = &guard.cached
            && at.elapsed() < self.ttl
        {
            return value.clone();
        }
        let value = f().await;
        guard.cached = Some((Instant::now(), value.clone()));
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn concurrent_callers_coalesce_to_one_execution() {
        let flight: Arc<SingleFlight<i64, u32>> = Arc::new(SingleFlight::new(Duration::from_secs(5)));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let flight = flight.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                flight
                    .run(1, || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        42
                    })
                    .await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        assert!(results.iter().all(|value| *value == 42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_run_independently() {
        let flight: SingleFlight<&'static str, u32> = SingleFlight::new(Duration::from_secs(5));
        let a = flight.run("a", || async { 1 }).await;
        let b = flight.run("b", || async { 2 }).await;
        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }

    #[tokio::test]
    async fn expired_entry_reruns() {
        let flight: SingleFlight<&'static str, u32> = SingleFlight::new(Duration::from_millis(10));
        let calls = Arc::new(AtomicUsize::new(0));
        let c1 = calls.clone();
        flight
            .run("k", || async move {
                c1.fetch_add(1, Ordering::SeqCst);
                1
            })
            .await;
        tokio::time::sleep(Duration::from_millis(25)).await;
        let c2 = calls.clone();
        flight
            .run("k", || async move {
                c2.fetch_add(1, Ordering::SeqCst);
                2
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
