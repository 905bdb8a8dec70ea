use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::{sync::Notify, time::MissedTickBehavior};

/// In-flight flag shared between a timer and the fetch it spawns.
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    busy: Arc<AtomicBool>,
}

/// Clears the in-flight flag when dropped.
#[derive(Debug)]
pub struct FlightGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` while another fetch is still outstanding.
    pub fn try_begin(&self) -> Option<FlightGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard {
                busy: self.busy.clone(),
            })
    }

    pub fn in_flight(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Timer driven fetch loop. A tick that lands while the previous fetch is
/// still running is dropped, not queued.
pub struct Poller {
    interval: Duration,
    flight: SingleFlight,
}

impl Poller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            flight: SingleFlight::new(),
        }
    }

    /// Run until `shutdown` is notified. The first tick fires immediately.
    pub async fn run<F, Fut>(self, shutdown: Arc<Notify>, mut fetch: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let stop = shutdown.notified();
        tokio::pin!(stop);

        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = ticker.tick() => {
                    let Some(guard) = self.flight.try_begin() else {
                        tracing::trace!("previous poll still running, skipping tick");
                        continue;
                    };
                    let fut = fetch();
                    tokio::spawn(async move {
                        fut.await;
                        drop(guard);
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn guard_releases_flag() {
        let flight = SingleFlight::new();
        let guard = flight.try_begin().expect("first begin");
        assert!(flight.in_flight());
        assert!(flight.try_begin().is_none());
        drop(guard);
        assert!(!flight.in_flight());
        assert!(flight.try_begin().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_ticks_are_skipped() {
        let started = Arc::new(AtomicUsize::new(0));
        let shutdown = Arc::new(Notify::new());

        let poller = Poller::new(Duration::from_secs(5));
        let task = {
            let started = started.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(poller.run(shutdown, move || {
                let started = started.clone();
                async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    // each fetch outlives two ticks
                    tokio::time::sleep(Duration::from_secs(12)).await;
                }
            }))
        };

        // ticks at 0, 5, 10, 15, 20, 25: fetches start at 0 and 15 only
        tokio::time::sleep(Duration::from_secs(26)).await;
        assert_eq!(started.load(Ordering::SeqCst), 2);

        shutdown.notify_waiters();
        task.await.unwrap();
    }
}
