use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::{
    sync::{Notify, mpsc, watch},
    time::{Instant, MissedTickBehavior, interval, interval_at, sleep_until},
};

use libs::{display_settings::DisplaySettings, models::Upload, poll::SingleFlight};

use crate::{
    feed::Feed,
    scheduler::{Advance, Slideshow, View},
    screen::{Screen, Slide},
};

/// Drives a `Slideshow` from timers: polling while idle, the per-item switch,
/// and the periodic QR overlay.
pub struct Runner<F: Feed, S: Screen> {
    feed: F,
    screen: S,
    settings: watch::Receiver<DisplaySettings>,
    shutdown: Arc<Notify>,
    show: Slideshow,
}

impl<F: Feed, S: Screen> Runner<F, S> {
    pub fn new(
        feed: F,
        screen: S,
        settings: watch::Receiver<DisplaySettings>,
        shutdown: Arc<Notify>,
    ) -> Self {
        Self {
            feed,
            screen,
            settings,
            shutdown,
            show: Slideshow::new(),
        }
    }

    async fn render(&mut self) -> Result<()> {
        let (upload, index, len) = match self.show.current() {
            View::Qr => return self.screen.qr(),
            View::Waiting => return self.screen.waiting(),
            View::Slide { upload, index, len } => (upload.clone(), index, len),
        };

        let image = match upload.photo_url.as_deref() {
            Some(url) if self.screen.wants_images() => self.feed.image(url).await,
            _ => None,
        };
        self.screen.slide(&Slide {
            upload: &upload,
            index,
            len,
            image: image.as_ref(),
        })
    }

    /// A frame that fails to draw is skipped; the timers keep running.
    async fn redraw(&mut self) {
        if let Err(e) = self.render().await {
            tracing::warn!("render failed: {e:#}");
        }
    }

    fn spawn_poll(&self, flight: &SingleFlight, tx: &mpsc::Sender<Vec<Upload>>) {
        let Some(guard) = flight.try_begin() else {
            return;
        };
        let feed = self.feed.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            match feed.fetch().await {
                Ok(items) => {
                    let _ = tx.send(items).await;
                }
                Err(e) => tracing::warn!("polling approved uploads failed: {e}"),
            }
            drop(guard);
        });
    }

    // Fire-and-forget: a lost notification only means a repeat after restart.
    fn spawn_mark_displayed(&self, ids: Vec<String>) {
        for id in ids {
            let feed = self.feed.clone();
            tokio::spawn(async move {
                if let Err(e) = feed.mark_displayed(&id).await {
                    tracing::warn!(%id, "marking upload as displayed failed: {e}");
                }
            });
        }
    }

    /// Run until shutdown or until the screen asks to quit. Returns the final
    /// slideshow state.
    pub async fn run(mut self) -> Result<Slideshow> {
        let mut current = self.settings.borrow_and_update().clone();
        let mut settings_live = true;

        let (tx, mut rx) = mpsc::channel::<Vec<Upload>>(4);
        let flight = SingleFlight::new();

        let mut poll = interval(current.poll_interval());
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut qr_tick = interval_at(Instant::now() + current.qr_interval(), current.qr_interval());
        let mut next_switch = Instant::now() + current.item_duration();
        let mut qr_hide_at: Option<Instant> = None;

        let pump_every = self.screen.pump_interval();
        let mut pump = interval(pump_every.unwrap_or(Duration::from_secs(3600)));

        let shutdown = self.shutdown.clone();
        let stop = shutdown.notified();
        tokio::pin!(stop);

        self.redraw().await;

        loop {
            tokio::select! {
                _ = &mut stop => break,

                changed = self.settings.changed(), if settings_live => {
                    if changed.is_err() {
                        settings_live = false;
                        continue;
                    }
                    current = self.settings.borrow_and_update().clone();
                    tracing::info!(?current, "display timings changed");
                    poll = interval(current.poll_interval());
                    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    qr_tick = interval_at(Instant::now() + current.qr_interval(), current.qr_interval());
                    if let Some(at) = qr_hide_at {
                        qr_hide_at = Some(at.min(Instant::now() + current.qr_duration()));
                    }
                    next_switch = Instant::now() + current.item_duration();
                }

                _ = poll.tick(), if self.show.should_poll() => {
                    self.spawn_poll(&flight, &tx);
                }

                Some(items) = rx.recv() => {
                    let was_active = self.show.is_active();
                    let added = self.show.merge(items);
                    if added > 0 {
                        tracing::debug!(added, queued = self.show.queue_len(), "queued new uploads");
                    }
                    if !was_active && self.show.is_active() {
                        next_switch = Instant::now() + current.item_duration();
                        self.redraw().await;
                    }
                }

                _ = sleep_until(next_switch), if self.show.rotating() => {
                    match self.show.advance() {
                        Advance::Next(_) => next_switch += current.item_duration(),
                        Advance::Finished(ids) => {
                            tracing::info!(count = ids.len(), "run finished, back to idle");
                            self.spawn_mark_displayed(ids);
                        }
                        Advance::Idle => {}
                    }
                    self.redraw().await;
                }

                _ = qr_tick.tick() => {
                    if self.show.qr_visible() {
                        continue;
                    }
                    self.show.show_qr();
                    qr_hide_at = Some(Instant::now() + current.qr_duration());
                    self.redraw().await;
                }

                _ = sleep_until(qr_hide_at.unwrap_or_else(Instant::now)), if qr_hide_at.is_some() => {
                    qr_hide_at = None;
                    self.show.hide_qr();
                    // the interrupted item gets a full slot again
                    next_switch = Instant::now() + current.item_duration();
                    self.redraw().await;
                }

                _ = pump.tick(), if pump_every.is_some() => {
                    if !self.screen.pump() {
                        tracing::info!("screen closed");
                        break;
                    }
                }
            }
        }

        Ok(self.show)
    }
}
