//! User interrupt plumbing.
//!
//! A [`CancelHandle`] fires once; every [`CancelSignal`] cloned from it sees
//! the cancellation, including signals created after it fired.

use tokio::sync::watch;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

#[derive(Debug, Clone)]
pub struct CancelSignal {
    receiver: watch::Receiver<bool>,
}

pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (sender, receiver) = watch::channel(false);
    (CancelHandle { sender }, CancelSignal { receiver })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            receiver: self.sender.subscribe(),
        }
    }

    /// Fire on the first Ctrl-C.
    pub fn cancel_on_ctrl_c(&self) {
        let handle = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling");
                handle.cancel();
            }
        });
    }
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        cancel_pair().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once cancelled. Pends forever if the handle is dropped first.
    pub async fn cancelled(&mut self) {
        if self.receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
