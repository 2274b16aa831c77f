use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};

/// Creates a coalescing redraw channel.
///
/// The channel holds at most one pending request, so any number of requests
/// made between two renders collapse into one.
pub fn redraw_channel() -> (RedrawSender, RedrawReceiver) {
    let (tx, rx) = bounded(1);
    (RedrawSender(tx), RedrawReceiver(rx))
}

#[derive(Clone, Debug)]
pub struct RedrawSender(Sender<()>);

impl RedrawSender {
    /// Asks the host to redraw. Never blocks. Returns `false` only when the
    /// host side is gone.
    pub fn request(&self) -> bool {
        match self.0.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => true,
            Err(TrySendError::Disconnected(())) => false,
        }
    }
}

/// Result of waiting for a redraw request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedrawWait {
    Requested,
    TimedOut,
    Closed,
}

#[derive(Debug)]
pub struct RedrawReceiver(Receiver<()>);

impl RedrawReceiver {
    pub fn wait_timeout(&self, timeout: Duration) -> RedrawWait {
        match self.0.recv_timeout(timeout) {
            Ok(()) => RedrawWait::Requested,
            Err(RecvTimeoutError::Timeout) => RedrawWait::TimedOut,
            Err(RecvTimeoutError::Disconnected) => RedrawWait::Closed,
        }
    }

    /// Consumes a pending request if there is one.
    pub fn try_take(&self) -> bool {
        self.0.try_recv().is_ok()
    }
}
