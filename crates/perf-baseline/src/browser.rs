//! Chrome DevTools Protocol implementation of [`PageProbe`]
//!
//! # How it works
//!
//! 1. [`BrowserSession`] launches one headless browser with the configured
//!    viewport and hands out a [`ChromiumProbe`] per page
//! 2. The probe evaluates small expressions in the page: `performance.now()`,
//!    a visibility check on `[data-test-subj="..."]`, and
//!    `performance.memory.usedJSHeapSize`
//! 3. Layout shifts are buffered by a `PerformanceObserver` registered under
//!    `window.__perfBaselineObservers` and drained from Rust, so the CLS
//!    arithmetic happens in [`crate::metrics::CumulativeLayoutShift`]

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, instrument, trace};

use crate::config::Config;
use crate::error::{PerfError, Result};
use crate::metrics::{LayoutShiftEntry, LayoutShiftObserver, PageProbe};

const VISIBILITY_POLL_INTERVAL: Duration = Duration::from_millis(100);

static OBSERVER_ID: AtomicU64 = AtomicU64::new(0);

/// A launched browser
pub struct BrowserSession {
    browser: Browser,
    _handle: tokio::task::JoinHandle<()>,
}

impl BrowserSession {
    /// Launch a browser sized to the configured viewport
    ///
    /// # Example
    ///
    /// ```no_run
    /// use perf_baseline::browser::BrowserSession;
    /// use perf_baseline::config::Config;
    ///
    /// # async fn example(config: &Config) -> perf_baseline::Result<()> {
    /// let session = BrowserSession::launch(config, false).await?;
    /// let probe = session.open_page("http://localhost:5601/app/discover").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn launch(config: &Config, headful: bool) -> Result<Self> {
        let width = config.suite.viewport_width;
        let height = config.suite.viewport_height;

        let mut builder = BrowserConfig::builder()
            .window_size(width, height)
            .viewport(Viewport {
                width,
                height,
                device_scale_factor: Some(1.0),
                emulating_mobile: false,
                is_landscape: false,
                has_touch: false,
            });
        if headful {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(PerfError::Browser)?;

        Self::with_config(browser_config).await
    }

    /// Launch with a custom browser configuration
    pub async fn with_config(config: BrowserConfig) -> Result<Self> {
        info!("Launching browser");
        let (browser, mut handler) = Browser::launch(config).await?;

        // Spawn handler to process browser events
        let handle = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        info!("Browser launched successfully");
        Ok(Self {
            browser,
            _handle: handle,
        })
    }

    /// Open a new page at `url` and wait for the navigation to settle
    #[instrument(skip(self))]
    pub async fn open_page(&self, url: &str) -> Result<ChromiumProbe> {
        let page = self.browser.new_page("about:blank").await?;
        page.goto(url).await?;
        page.wait_for_navigation().await?;
        debug!("Opened {}", url);
        Ok(ChromiumProbe::new(page))
    }

    pub async fn close(mut self) -> Result<()> {
        info!("Closing browser");
        self.browser.close().await?;
        self._handle.abort();
        Ok(())
    }
}

/// [`PageProbe`] over a chromiumoxide page
#[derive(Debug, Clone)]
pub struct ChromiumProbe {
    page: Page,
}

impl ChromiumProbe {
    pub fn new(page: Page) -> Self {
        Self { page }
    }
}

fn evaluate_params(expression: String) -> Result<EvaluateParams> {
    trace!("Evaluating: {}", expression);
    EvaluateParams::builder()
        .expression(expression)
        .return_by_value(true)
        .build()
        .map_err(PerfError::Browser)
}

async fn eval<T: DeserializeOwned>(page: &Page, expression: String) -> Result<T> {
    page.evaluate_expression(evaluate_params(expression)?)
        .await?
        .into_value::<T>()
        .map_err(|e| PerfError::Browser(format!("unexpected evaluation result: {}", e)))
}

/// A `null` result comes back with no value at all, so it is matched here
/// rather than deserialized
fn heap_bytes(value: Option<&Value>) -> Result<u64> {
    match value {
        None | Some(Value::Null) => Err(PerfError::Unsupported("performance.memory".to_string())),
        Some(value) => value
            .as_f64()
            .map(|bytes| bytes as u64)
            .ok_or_else(|| PerfError::Browser(format!("unexpected heap size: {}", value))),
    }
}

/// JS string literal for `s`
fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

fn visibility_script(test_id: &str) -> String {
    format!(
        r#"(() => {{
    const el = document.querySelector('[data-test-subj="' + CSS.escape({id}) + '"]');
    if (!el) return false;
    const style = window.getComputedStyle(el);
    const rect = el.getBoundingClientRect();
    return style.display !== 'none' && style.visibility !== 'hidden'
        && Number(style.opacity) > 0 && rect.width > 0 && rect.height > 0;
}})()"#,
        id = js_string(test_id)
    )
}

fn observe_script(id: u64) -> String {
    format!(
        r#"(() => {{
    const registry = (window.__perfBaselineObservers = window.__perfBaselineObservers || {{}});
    const entries = [];
    const record = (list) => {{
        for (const entry of list) {{
            entries.push({{ value: entry.value, hadRecentInput: entry.hadRecentInput }});
        }}
    }};
    const observer = new PerformanceObserver((list) => record(list.getEntries()));
    observer.observe({{ type: 'layout-shift', buffered: true }});
    registry[{id}] = {{ observer, entries, record }};
    return true;
}})()"#
    )
}

fn take_script(id: u64) -> String {
    format!(
        r#"(() => {{
    const o = (window.__perfBaselineObservers || {{}})[{id}];
    if (!o) return [];
    o.record(o.observer.takeRecords());
    return o.entries.splice(0);
}})()"#
    )
}

fn disconnect_script(id: u64) -> String {
    format!(
        r#"(() => {{
    const registry = window.__perfBaselineObservers || {{}};
    const o = registry[{id}];
    if (o) {{
        o.observer.disconnect();
        delete registry[{id}];
    }}
    return true;
}})()"#
    )
}

const HEAP_SCRIPT: &str =
    "(() => (performance.memory ? performance.memory.usedJSHeapSize : null))()";

#[async_trait]
impl PageProbe for ChromiumProbe {
    async fn now_ms(&self) -> Result<f64> {
        eval(&self.page, "performance.now()".to_string()).await
    }

    #[instrument(skip(self))]
    async fn wait_until_visible(&self, test_id: &str, wait: Duration) -> Result<()> {
        let script = visibility_script(test_id);
        let started = Instant::now();

        let polled = timeout(wait, async {
            loop {
                if eval::<bool>(&self.page, script.clone()).await? {
                    return Ok::<_, PerfError>(());
                }
                tokio::time::sleep(VISIBILITY_POLL_INTERVAL).await;
            }
        })
        .await;

        match polled {
            Ok(result) => {
                result?;
                debug!("{} visible after {:?}", test_id, started.elapsed());
                Ok(())
            }
            Err(_) => Err(PerfError::VisibilityTimeout {
                test_id: test_id.to_string(),
                timeout: wait,
            }),
        }
    }

    async fn observe_layout_shift(&self) -> Result<Box<dyn LayoutShiftObserver>> {
        let id = OBSERVER_ID.fetch_add(1, Ordering::SeqCst);
        eval::<bool>(&self.page, observe_script(id)).await?;
        debug!("Layout-shift observer {} connected", id);
        Ok(Box::new(ChromiumLayoutShiftObserver {
            page: self.page.clone(),
            id,
        }))
    }

    async fn used_heap_bytes(&self) -> Result<u64> {
        let result = self
            .page
            .evaluate_expression(evaluate_params(HEAP_SCRIPT.to_string())?)
            .await?;
        heap_bytes(result.value())
    }

    async fn close(&self) -> Result<()> {
        self.page.clone().close().await?;
        Ok(())
    }
}

struct ChromiumLayoutShiftObserver {
    page: Page,
    id: u64,
}

#[async_trait]
impl LayoutShiftObserver for ChromiumLayoutShiftObserver {
    async fn take_entries(&mut self) -> Result<Vec<LayoutShiftEntry>> {
        eval(&self.page, take_script(self.id)).await
    }

    async fn disconnect(self: Box<Self>) -> Result<()> {
        eval::<bool>(&self.page, disconnect_script(self.id)).await?;
        debug!("Layout-shift observer {} disconnected", self.id);
        Ok(())
    }
}
