use tokio::sync::mpsc;

use crate::data::Pacing;
use crate::error::{DispatchError, Result};

/// Create a rate-control pair.
///
/// The [`RateControl`] handle may be cloned and kept by any number of
/// callers; [`RateUpdates`] is consumed by exactly one dispatcher.
pub fn rate_channel(capacity: usize) -> (RateControl, RateUpdates) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (RateControl { tx }, RateUpdates { rx: Some(rx) })
}

/// Changes the pacing of a running dispatcher.
///
/// An update takes effect before the next admission.
#[derive(Debug, Clone)]
pub struct RateControl {
    tx: mpsc::Sender<Pacing>,
}

impl RateControl {
    pub async fn set_pacing(&self, pacing: Pacing) -> Result<()> {
        self.tx
            .send(pacing)
            .await
            .map_err(|_| DispatchError::ChannelClosed)
    }

    pub async fn set_qps(&self, qps: u32) -> Result<()> { self.set_pacing(Pacing::from_qps(qps)).await }

    /// Non-blocking variant for callers outside an async context.
    pub fn try_set_qps(&self, qps: u32) -> Result<()> {
        self.tx
            .try_send(Pacing::from_qps(qps))
            .map_err(|_| DispatchError::ChannelClosed)
    }
}

/// Receiving side of the rate-control channel.
#[derive(Debug)]
pub struct RateUpdates {
    rx: Option<mpsc::Receiver<Pacing>>,
}

impl RateUpdates {
    /// Updates that never arrive; the initial pacing stays fixed.
    pub fn fixed() -> Self { Self { rx: None } }

    pub(crate) fn is_open(&self) -> bool { self.rx.is_some() }

    /// Next update, or `None` once every [`RateControl`] is dropped.
    pub(crate) async fn recv(&mut self) -> Option<Pacing> {
        let rx = self.rx.as_mut()?;
        let update = rx.recv().await;
        if update.is_none() {
            self.rx = None;
        }
        update
    }
}
