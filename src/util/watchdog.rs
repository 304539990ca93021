//! Session watchdog: Ctrl-C and the overall deadline
// (c) 2025 Ross Younger

use std::future::pending;
use std::time::Duration;

use human_repr::HumanDuration as _;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

/// Cancels `token` on Ctrl-C, or once `deadline` has elapsed.
///
/// Returns as soon as the token is cancelled, whoever cancelled it.
pub(crate) async fn watch(token: CancellationToken, deadline: Option<Duration>) {
    let expiry = async {
        match deadline {
            Some(d) => {
                tokio::time::sleep(d).await;
                d
            }
            None => pending().await,
        }
    };
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("unable to listen for Ctrl-C: {e}");
            pending::<()>().await;
        }
    };

    tokio::select! {
        () = token.cancelled() => trace!("watchdog stood down"),
        () = interrupt => {
            warn!("interrupted");
            token.cancel();
        }
        d = expiry => {
            warn!("deadline of {} expired", d.human_duration());
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::watch;
    use std::time::Duration;
    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    #[tokio::test(start_paused = true)]
    async fn deadline_cancels() {
        let token = CancellationToken::new();
        let start = Instant::now();
        watch(token.clone(), Some(Duration::from_secs(30))).await;
        assert!(token.is_cancelled());
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn stands_down_when_cancelled_elsewhere() {
        let token = CancellationToken::new();
        let guard = token.clone().drop_guard();
        let watcher = tokio::spawn(watch(token.clone(), None));
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(!watcher.is_finished());
        drop(guard);
        watcher.await.unwrap();
        assert!(token.is_cancelled());
    }
}
