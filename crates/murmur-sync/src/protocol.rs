//! The pull exchange.
//!
//! One round is a single round trip on one connection:
//!
//! ```text
//! Active (initiator)                     Passive (acceptor)
//!   |-------- Summary {versions} --------->|  ensure_known(versions)
//!   |<------- Diff {entries} -------------|  diff_missing_or_newer(versions)
//!   merge(entries)
//! ```
//!
//! Only the active side learns anything from a round. The passive side
//! answers with exactly the entries the active side lacks, bounded by the
//! active side's own claim, and never imports values from it.

use std::sync::Arc;
use std::time::Duration;

use murmur_core::NodeAddress;
use murmur_store::StateStore;

use crate::codec::{read_frame, write_frame, Codec};
use crate::config::SyncConfig;
use crate::connection::PeerConnection;
use crate::error::{Result, SyncError};
use crate::messages::GossipMessage;
use crate::shutdown::ShutdownSignal;
use crate::transport::BoxStream;

/// Result of one active round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundReport {
    /// The peer the round ran against.
    pub target: NodeAddress,
    /// Entries carried by the peer's diff.
    pub entries_received: usize,
    /// Entries adopted into local state.
    pub adopted: usize,
    /// Addresses learned for the first time.
    pub new_addresses: usize,
}

/// Run one round as the active side over `conn`.
pub async fn exchange(
    conn: &PeerConnection,
    state: &StateStore,
    round_timeout: Duration,
) -> Result<RoundReport> {
    let versions = state.summarize_max_versions();
    let reply = conn
        .request(&GossipMessage::Summary { versions }, round_timeout)
        .await?;

    let entries = match reply {
        GossipMessage::Diff { entries } => entries,
        other => {
            return Err(SyncError::UnexpectedMessage(format!(
                "expected Diff, got {}",
                other.kind()
            )))
        }
    };

    let entries_received = entries.values().map(|info| info.len()).sum();
    let outcome = state.merge(entries);

    let report = RoundReport {
        target: conn.target().clone(),
        entries_received,
        adopted: outcome.adopted,
        new_addresses: outcome.new_addresses.len(),
    };
    if !outcome.is_noop() {
        tracing::debug!(
            target = %report.target,
            adopted = report.adopted,
            new_addresses = report.new_addresses,
            "merged diff"
        );
    }
    Ok(report)
}

/// Answer summaries arriving on an accepted stream until the peer hangs up,
/// an error occurs, or shutdown is signalled.
///
/// Returns the number of rounds served. Errors are scoped to this stream;
/// the caller only logs them.
pub async fn serve_passive(
    stream: BoxStream,
    peer: &str,
    state: Arc<StateStore>,
    codec: Arc<dyn Codec>,
    config: &SyncConfig,
    mut shutdown: ShutdownSignal,
) -> Result<usize> {
    let (mut reader, mut writer) = tokio::io::split(stream);
    let mut served = 0;

    loop {
        let frame = tokio::select! {
            _ = shutdown.triggered() => return Ok(served),
            frame = read_frame(&mut reader, codec.as_ref(), config.max_frame_bytes) => frame?,
        };

        let versions = match frame {
            Some(GossipMessage::Summary { versions }) => versions,
            Some(other) => {
                return Err(SyncError::UnexpectedMessage(format!(
                    "expected Summary, got {}",
                    other.kind()
                )))
            }
            None => {
                tracing::debug!(%peer, served, "peer closed connection");
                return Ok(served);
            }
        };

        let created = state.ensure_known(versions.keys());
        if created > 0 {
            tracing::debug!(%peer, created, "learned addresses from summary");
        }

        let entries = state.diff_missing_or_newer(&versions);
        let reply = GossipMessage::Diff { entries };

        tokio::time::timeout(
            config.round_timeout,
            write_frame(&mut writer, codec.as_ref(), &reply, config.max_frame_bytes),
        )
        .await
        .map_err(|_| SyncError::Timeout(format!("sending diff to {peer}")))??;

        served += 1;
    }
}
