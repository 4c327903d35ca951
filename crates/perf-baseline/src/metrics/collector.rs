//! Render time, layout shift and memory measurements
//!
//! The collector only measures. Comparing against baselines happens in
//! [`crate::compare`].

use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{
    CumulativeLayoutShift, LayoutShiftEntry, LayoutShiftObserver, MetricKind, MetricSample,
    PageProbe,
};
use crate::error::Result;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Measures a component through a [`PageProbe`]
pub struct MetricCollector<'a> {
    probe: &'a dyn PageProbe,
}

impl<'a> MetricCollector<'a> {
    pub fn new(probe: &'a dyn PageProbe) -> Self {
        Self { probe }
    }

    /// Time from now until the element with `test_id` is visible
    ///
    /// The visibility timeout is the caller's; a timeout is returned as an
    /// error rather than a sample.
    #[instrument(skip(self))]
    pub async fn render_time(&self, test_id: &str, timeout: Duration) -> Result<MetricSample> {
        let start = self.probe.now_ms().await?;
        self.probe.wait_until_visible(test_id, timeout).await?;
        let end = self.probe.now_ms().await?;

        let render_time = end - start;
        debug!("{} visible after {:.2}ms", test_id, render_time);
        Ok(MetricSample::new(MetricKind::RenderTime, render_time))
    }

    /// Cumulative layout shift observed over `window`
    ///
    /// The observer is disconnected when the window closes, whether or not
    /// reading its entries succeeded. If the future is dropped mid-window the
    /// disconnect is spawned onto the current runtime instead.
    #[instrument(skip(self))]
    pub async fn layout_shift(&self, window: Duration) -> Result<MetricSample> {
        let mut observer = ObserverGuard(Some(self.probe.observe_layout_shift().await?));

        let entries = async {
            tokio::time::sleep(window).await;
            observer.take_entries().await
        }
        .await;

        observer.disconnect().await;

        let mut cls = CumulativeLayoutShift::default();
        cls.extend(&entries?);
        debug!(
            "CLS {:.4} from {} shifts ({} ignored after input)",
            cls.score(),
            cls.counted(),
            cls.ignored()
        );
        Ok(MetricSample::new(MetricKind::LayoutShift, cls.score()))
    }

    /// JS heap in use, in binary megabytes
    #[instrument(skip(self))]
    pub async fn memory(&self) -> Result<MetricSample> {
        let bytes = self.probe.used_heap_bytes().await?;
        let megabytes = bytes_to_mb(bytes);
        debug!("Heap in use: {:.2}MB", megabytes);
        Ok(MetricSample::new(MetricKind::MemoryMb, megabytes))
    }
}

pub(crate) fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// Owns a connected observer until it has been disconnected
struct ObserverGuard(Option<Box<dyn LayoutShiftObserver>>);

impl ObserverGuard {
    async fn take_entries(&mut self) -> Result<Vec<LayoutShiftEntry>> {
        match self.0.as_mut() {
            Some(observer) => observer.take_entries().await,
            None => Ok(Vec::new()),
        }
    }

    async fn disconnect(mut self) {
        if let Some(observer) = self.0.take() {
            disconnect_logged(observer).await;
        }
    }
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        let Some(observer) = self.0.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(disconnect_logged(observer));
            }
            Err(_) => warn!("Layout-shift observer dropped outside a runtime; left connected"),
        }
    }
}

async fn disconnect_logged(observer: Box<dyn LayoutShiftObserver>) {
    if let Err(e) = observer.disconnect().await {
        warn!("Failed to disconnect layout-shift observer: {}", e);
    }
}
