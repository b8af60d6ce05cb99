use std::path::PathBuf;

const BROWSER_BINARIES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "microsoft-edge",
];

const BROWSER_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
];

/// Locate a Chromium-family browser binary.
///
/// Order: `PLAYWRIGHT_CHROMIUM_EXECUTABLE_PATH`, well-known install paths,
/// then the system `PATH`. Returns `None` to let Playwright use its own
/// bundled browser.
pub fn find_browser() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("PLAYWRIGHT_CHROMIUM_EXECUTABLE_PATH") {
        let p = PathBuf::from(path);
        if p.exists() {
            return Some(p);
        }
    }

    for path in BROWSER_PATHS {
        let p = PathBuf::from(path);
        if p.exists() {
            return Some(p);
        }
    }

    BROWSER_BINARIES
        .iter()
        .find_map(|name| which::which(name).ok())
}
