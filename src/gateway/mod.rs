//! Gateway: the event loop connecting channels, the message pipeline, and
//! the background maintenance and reminder tasks.

mod delivery;
mod maintenance;
mod pipeline;
mod scheduler;

#[cfg(test)]
mod tests;

pub use pipeline::Outcome;

use crate::analytics::Analytics;
use crate::handlers::Handlers;
use crate::humanize::Humanizer;
use crate::owner::{AutoReply, Takeover};
use crate::safety::SafetyFilter;
use crate::trigger::TriggerGate;
use chrono::Utc;
use doppel_core::{config::Config, message::Envelope, traits::Channel};
use doppel_memory::Store;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Lock a std mutex, recovering the data if a previous holder panicked.
pub(crate) fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// The central gateway that routes envelopes from channels through the pipeline.
///
/// Owner state (takeover, auto-reply) and analytics are mutated only from the
/// run loop's task. The maintenance and reminder tasks touch the store,
/// the filesystem, and channel sends, never those maps.
pub struct Gateway {
    pub(super) handlers: Handlers,
    pub(super) channels: HashMap<String, Arc<dyn Channel>>,
    pub(super) store: Store,
    pub(super) config: Config,
    pub(super) trigger: TriggerGate,
    pub(super) humanizer: Humanizer,
    pub(super) safety: SafetyFilter,
    pub(super) takeover: Mutex<Takeover>,
    pub(super) auto_reply: Mutex<AutoReply>,
    pub(super) analytics: Mutex<Analytics>,
    pub(super) rng: Mutex<StdRng>,
    pub(super) uptime: Instant,
    /// Sleep through each part's typing delay. Off for one-shot and test runs.
    pub(super) simulate_typing: bool,
}

impl Gateway {
    pub fn new(
        config: Config,
        handlers: Handlers,
        store: Store,
        channels: HashMap<String, Arc<dyn Channel>>,
    ) -> Self {
        let gw = &config.gateway;
        Self {
            trigger: TriggerGate::new(&config.persona.name, &config.persona.bot_id),
            humanizer: Humanizer::new(gw),
            safety: SafetyFilter::default(),
            takeover: Mutex::new(Takeover::new(gw.silence_window_secs, gw.takeover_gc_secs)),
            auto_reply: Mutex::new(AutoReply::default()),
            analytics: Mutex::new(Analytics::new()),
            rng: Mutex::new(StdRng::from_entropy()),
            uptime: Instant::now(),
            simulate_typing: true,
            handlers,
            channels,
            store,
            config,
        }
    }

    /// Replace the safety filter, e.g. with one extended by stored rules.
    pub fn with_safety(mut self, safety: SafetyFilter) -> Self {
        self.safety = safety;
        self
    }

    /// Seed the jitter source.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Deliver parts back to back instead of sleeping through typing delays.
    pub fn without_typing_delays(mut self) -> Self {
        self.simulate_typing = false;
        self
    }

    /// Run the main event loop until Ctrl-C or until every channel closes.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        info!(
            "Doppel gateway running | persona: {} | provider: {} | channels: {}",
            self.config.persona.name,
            self.handlers.provider_name(),
            self.channels.keys().cloned().collect::<Vec<_>>().join(", "),
        );

        let (tx, mut rx) = mpsc::channel::<Envelope>(256);

        for (name, channel) in &self.channels {
            let mut channel_rx = channel
                .start()
                .await
                .map_err(|e| anyhow::anyhow!("failed to start channel {name}: {e}"))?;
            let tx = tx.clone();
            let channel_name = name.clone();

            tokio::spawn(async move {
                while let Some(env) = channel_rx.recv().await {
                    if tx.send(env).await.is_err() {
                        info!("gateway receiver dropped, stopping {channel_name} forwarder");
                        break;
                    }
                }
            });

            info!("Channel started: {name}");
        }

        drop(tx);

        let maint = self.clone();
        let maint_handle = tokio::spawn(async move {
            maint.maintenance_loop().await;
        });

        let sched_handle = if self.config.scheduler.enabled {
            let sched = self.clone();
            Some(tokio::spawn(async move {
                sched.scheduler_loop().await;
            }))
        } else {
            None
        };

        let mut gc_tick = tokio::time::interval(Duration::from_secs(
            self.config.gateway.maintenance_interval_secs.max(1),
        ));

        // Envelopes are processed one at a time, in arrival order.
        loop {
            tokio::select! {
                next = rx.recv() => match next {
                    Some(env) => {
                        self.handle_envelope(env).await;
                    }
                    None => {
                        info!("All channels closed");
                        break;
                    }
                },
                _ = gc_tick.tick() => {
                    self.gc_takeovers(Utc::now().timestamp_millis());
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown(&maint_handle, &sched_handle).await;
        Ok(())
    }

    /// Graceful shutdown: stop background tasks and channels, checkpoint the WAL.
    async fn shutdown(
        &self,
        maint_handle: &JoinHandle<()>,
        sched_handle: &Option<JoinHandle<()>>,
    ) {
        info!("Shutting down...");

        maint_handle.abort();
        if let Some(h) = sched_handle {
            h.abort();
        }

        for (name, channel) in &self.channels {
            if let Err(e) = channel.stop().await {
                warn!("failed to stop channel {name}: {e}");
            }
        }

        if let Err(e) = self.store.checkpoint().await {
            warn!("final checkpoint failed: {e}");
        }

        info!("Shutdown complete.");
    }
}
