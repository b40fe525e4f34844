use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::ProgressSnapshot;

/// Render-only progress display.
///
/// Receives snapshots over a watch channel and draws them; exits when the
/// sending side is dropped.
pub struct ProgressTicker {
    bar: ProgressBar,
    handle: JoinHandle<()>,
}

impl ProgressTicker {
    /// Draw to the terminal.
    pub fn spawn(label: &str, receiver: watch::Receiver<ProgressSnapshot>) -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos:>3}% {prefix}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self::with_bar(bar, label, receiver)
    }

    /// Same task without drawing anything.
    pub fn hidden(label: &str, receiver: watch::Receiver<ProgressSnapshot>) -> Self {
        Self::with_bar(ProgressBar::hidden(), label, receiver)
    }

    fn with_bar(bar: ProgressBar, label: &str, mut receiver: watch::Receiver<ProgressSnapshot>) -> Self {
        bar.set_message(label.to_string());
        let task_bar = bar.clone();
        let handle = tokio::spawn(async move {
            while receiver.changed().await.is_ok() {
                let snapshot = *receiver.borrow_and_update();
                render(&task_bar, &snapshot);
            }
        });
        Self { bar, handle }
    }

    /// Wait for the sender to go away, then clear the bar.
    ///
    /// Returns the last drawn percentage.
    pub async fn finish(self) -> u64 {
        let _ = self.handle.await;
        let position = self.bar.position();
        self.bar.finish_and_clear();
        position
    }
}

fn render(bar: &ProgressBar, snapshot: &ProgressSnapshot) {
    bar.set_position(snapshot.percentage.floor() as u64);
    let prefix = match (snapshot.eta, snapshot.throughput) {
        (Some(eta), Some(speed)) => format!("ETA {} ({:.1}x)", format_eta(eta), speed),
        _ => String::new(),
    };
    bar.set_prefix(prefix);
}

fn format_eta(eta: Duration) -> String {
    let secs = eta.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
