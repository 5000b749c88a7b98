use booking::config::WorkerConfig;
use booking::repos::Store;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info};
use uuid::Uuid;

/// Sessions whose last activity is at or before this instant are purged.
/// `None` when the TTL reaches past the representable range.
pub(crate) fn idle_cutoff(now: DateTime<Utc>, session_ttl_seconds: u64) -> Option<DateTime<Utc>> {
    i64::try_from(session_ttl_seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_sub_signed(ttl))
}

pub(crate) async fn purge_idle_sessions(
    store: &Store,
    config: &WorkerConfig,
    worker_id: Uuid,
) -> u64 {
    let Some(cutoff) = idle_cutoff(Utc::now(), config.session_ttl_seconds) else {
        debug!(worker_id = %worker_id, "session ttl too large, skipping purge");
        return 0;
    };
    let purged_rows = match store
        .purge_idle_chat_sessions_batch(cutoff, i64::from(config.session_purge_batch_size))
        .await
    {
        Ok(purged_rows) => purged_rows,
        Err(err) => {
            error!(
                worker_id = %worker_id,
                "failed to purge idle chat sessions: {err}"
            );
            return 0;
        }
    };

    if purged_rows > 0 {
        info!(
            worker_id = %worker_id,
            purged_rows,
            batch_size = config.session_purge_batch_size,
            cutoff = %cutoff,
            "chat session purge tick"
        );
    } else {
        debug!(
            worker_id = %worker_id,
            batch_size = config.session_purge_batch_size,
            "chat session purge tick found no idle sessions"
        );
    }

    purged_rows
}
