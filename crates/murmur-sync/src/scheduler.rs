//! Dissemination scheduler.
//!
//! Every tick picks `fan_out` targets uniformly at random, with replacement,
//! from the peers currently known to the state store, falling back to the
//! seed list while no peer is known. One exchange round runs per draw. A
//! failed round prunes the target's connection so the next tick redials.

use std::sync::Arc;

use rand::Rng;
use tokio::time::MissedTickBehavior;

use murmur_core::NodeAddress;
use murmur_store::StateStore;

use crate::config::SyncConfig;
use crate::directory::PeerDirectory;
use crate::error::Result;
use crate::protocol::{exchange, RoundReport};
use crate::shutdown::ShutdownSignal;

/// Summary of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Rounds started (one per draw).
    pub attempted: usize,
    /// Rounds that completed.
    pub succeeded: usize,
    /// Rounds that failed and pruned their target.
    pub failed: usize,
    /// Entries adopted across all rounds.
    pub adopted: usize,
}

/// Live peers if there are any, otherwise the seeds.
///
/// Both inputs are expected to exclude the local address already.
pub fn target_pool(live: Vec<NodeAddress>, seeds: &[NodeAddress]) -> Vec<NodeAddress> {
    if live.is_empty() {
        seeds.to_vec()
    } else {
        live
    }
}

/// `fan_out` independent uniform draws from `pool`. Repeats are allowed.
pub fn select_targets<R: Rng + ?Sized>(
    pool: &[NodeAddress],
    fan_out: usize,
    rng: &mut R,
) -> Vec<NodeAddress> {
    if pool.is_empty() {
        return Vec::new();
    }
    (0..fan_out)
        .map(|_| pool[rng.gen_range(0..pool.len())].clone())
        .collect()
}

/// Drives periodic exchange rounds.
pub struct Scheduler {
    state: Arc<StateStore>,
    directory: Arc<PeerDirectory>,
    seeds: Vec<NodeAddress>,
    config: SyncConfig,
}

impl Scheduler {
    /// Create a scheduler. The local address is dropped from `seeds`.
    pub fn new(
        state: Arc<StateStore>,
        directory: Arc<PeerDirectory>,
        seeds: Vec<NodeAddress>,
        config: SyncConfig,
    ) -> Self {
        let local = state.local_address().clone();
        let seeds = seeds.into_iter().filter(|seed| *seed != local).collect();
        Self {
            state,
            directory,
            seeds,
            config,
        }
    }

    /// Seeds used while no peer is known.
    pub fn seeds(&self) -> &[NodeAddress] {
        &self.seeds
    }

    /// Run one tick.
    pub async fn tick(&self) -> TickReport {
        let pool = target_pool(self.state.known_peers(), &self.seeds);
        let targets = select_targets(&pool, self.config.fan_out, &mut rand::thread_rng());

        let mut report = TickReport::default();
        for target in targets {
            report.attempted += 1;
            match self.round(&target).await {
                Ok(round) => {
                    report.succeeded += 1;
                    report.adopted += round.adopted;
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(%target, error = %e, "gossip round failed");
                    self.directory.remove(&target).await;
                }
            }
        }
        report
    }

    async fn round(&self, target: &NodeAddress) -> Result<RoundReport> {
        let conn = self.directory.get_or_create(target).await?;
        exchange(&conn, &self.state, self.config.round_timeout).await
    }

    /// Tick immediately, then every `gossip_interval`, until shutdown.
    ///
    /// A tick in progress when shutdown arrives runs to completion.
    pub async fn run(&self, mut shutdown: ShutdownSignal) {
        let mut interval = tokio::time::interval(self.config.gossip_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            local = %self.state.local_address(),
            fan_out = self.config.fan_out,
            interval_ms = self.config.gossip_interval.as_millis() as u64,
            "gossip scheduler started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.triggered() => break,
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }

        tracing::info!(local = %self.state.local_address(), "gossip scheduler stopped");
    }
}
