//! Terminal spinner shown while waiting on server tasks

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// A spinner ticked by a background tokio task until [`Spinner::stop`] is awaited
pub struct Spinner {
    bar: ProgressBar,
    stop_tx: oneshot::Sender<()>,
    ticker: JoinHandle<()>,
}

impl Spinner {
    pub fn start(message: impl Into<String>) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.into());

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let ticking = bar.clone();
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = interval.tick() => ticking.tick(),
                }
            }
        });

        Self {
            bar,
            stop_tx,
            ticker,
        }
    }

    /// Handle for updating the message from a progress callback
    pub fn bar(&self) -> ProgressBar {
        self.bar.clone()
    }

    pub async fn stop(self) {
        // The receiver is gone only if the ticker already exited
        let _ = self.stop_tx.send(());
        if let Err(e) = self.ticker.await {
            tracing::debug!("Spinner task ended abnormally: {}", e);
        }
        self.bar.finish_and_clear();
    }
}
