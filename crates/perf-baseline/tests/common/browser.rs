//! Browser helpers for tests that need a real Chrome

#![allow(dead_code)]

use chromiumoxide::browser::BrowserConfig;
use perf_baseline::browser::BrowserSession;

/// Check if browser tests should be skipped (when Chrome isn't available)
pub fn should_skip() -> bool {
    std::env::var("SKIP_BROWSER_TESTS").is_ok()
}

/// Skip the test when SKIP_BROWSER_TESTS is set
#[macro_export]
macro_rules! skip_if_no_chrome {
    () => {
        if browser::should_skip() {
            eprintln!("Skipping test: SKIP_BROWSER_TESTS is set");
            return;
        }
    };
}

/// Find Chrome for Testing installed by Puppeteer
pub fn find_chrome_for_testing() -> Option<std::path::PathBuf> {
    let home = std::env::var("HOME").ok()?;
    let puppeteer_cache = std::path::Path::new(&home).join(".cache/puppeteer/chrome");

    let mut versions: Vec<_> = std::fs::read_dir(&puppeteer_cache)
        .ok()?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .collect();
    versions.sort_by_key(|v| std::cmp::Reverse(v.path()));

    versions.into_iter().find_map(|version_dir| {
        [
            "chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
            "chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
            "chrome-linux64/chrome",
        ]
        .iter()
        .map(|relative| version_dir.path().join(relative))
        .find(|candidate| candidate.exists())
    })
}

/// Headless config with a private profile directory
pub fn test_browser_config() -> Result<BrowserConfig, String> {
    use std::sync::atomic::{AtomicU64, Ordering};
    static BROWSER_ID: AtomicU64 = AtomicU64::new(0);

    let mut builder = BrowserConfig::builder();
    if let Some(chrome_path) = find_chrome_for_testing() {
        eprintln!("Using Chrome for Testing: {}", chrome_path.display());
        builder = builder.chrome_executable(chrome_path);
    }

    // Unique per process and per browser so parallel tests don't share a profile
    let user_data_dir = std::env::temp_dir().join(format!(
        "perf-baseline-{}-{}",
        std::process::id(),
        BROWSER_ID.fetch_add(1, Ordering::SeqCst)
    ));
    if user_data_dir.exists() {
        let _ = std::fs::remove_dir_all(&user_data_dir);
    }

    builder.user_data_dir(user_data_dir).build()
}

/// Try to launch a session, skip test if Chrome not found
pub async fn require_session() -> Option<BrowserSession> {
    let config = match test_browser_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Skipping: no usable browser config ({})", e);
            return None;
        }
    };

    match BrowserSession::with_config(config).await {
        Ok(session) => Some(session),
        Err(e) => {
            if e.to_string().contains("Could not auto detect") {
                eprintln!("Skipping: Chrome not installed ({})", e);
                None
            } else {
                panic!("Unexpected browser error: {}", e);
            }
        }
    }
}
