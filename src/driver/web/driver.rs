//! Browser step executor using Playwright
//!
//! One browser process per batch; every run gets its own browser context
//! and page, closed when the run ends.

use async_trait::async_trait;
use playwright::api::{Browser, BrowserContext, Page, Viewport};
use playwright::Playwright;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::driver::action::StepAction;
use crate::driver::traits::{ExecutionResource, Session, StepExecutor, StepOutcome};
use crate::error::StepError;
use crate::model::TestSpecification;
use crate::utils::binary_resolver::find_browser;
use crate::utils::config::{BrowserConfig, BrowserType};

const CHROMIUM_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--ignore-certificate-errors",
];

/// Step executor backed by a real browser
pub struct BrowserExecutor {
    config: BrowserConfig,
    /// Bound for element waits inside a step (ms)
    wait_timeout_ms: u64,
}

impl BrowserExecutor {
    pub fn new(config: BrowserConfig, wait_timeout_ms: u64) -> Self {
        Self {
            config,
            wait_timeout_ms,
        }
    }
}

#[async_trait]
impl StepExecutor for BrowserExecutor {
    fn name(&self) -> &str {
        "browser"
    }

    async fn launch(&self) -> Result<Box<dyn ExecutionResource>, StepError> {
        let playwright = Playwright::initialize()
            .await
            .map_err(|e| StepError::Launch(format!("Failed to initialize Playwright: {}", e)))?;

        let browser = match self.config.browser_type {
            BrowserType::Chromium => launch_chromium(&playwright, &self.config).await?,
            BrowserType::Firefox => playwright
                .firefox()
                .launcher()
                .headless(self.config.headless)
                .launch()
                .await
                .map_err(|e| StepError::Launch(e.to_string()))?,
            BrowserType::Webkit => playwright
                .webkit()
                .launcher()
                .headless(self.config.headless)
                .launch()
                .await
                .map_err(|e| StepError::Launch(e.to_string()))?,
        };

        log::info!(
            "Playwright browser initialized ({:?}, headless: {})",
            self.config.browser_type,
            self.config.headless
        );

        Ok(Box::new(BrowserResource {
            _playwright: Arc::new(playwright),
            browser,
            config: self.config.clone(),
            wait_timeout_ms: self.wait_timeout_ms,
        }))
    }
}

async fn launch_chromium(
    playwright: &Playwright,
    config: &BrowserConfig,
) -> Result<Browser, StepError> {
    let chromium = playwright.chromium();
    let mut launcher = chromium.launcher().headless(config.headless);

    let executable = config.executable.clone().or_else(find_browser);
    if let Some(ref path) = executable {
        log::info!("Using browser executable: {}", path.display());
        launcher = launcher.executable(path);
    }

    let args: Vec<String> = CHROMIUM_ARGS.iter().map(|s| s.to_string()).collect();
    launcher = launcher.args(&args);

    launcher
        .launch()
        .await
        .map_err(|e| StepError::Launch(format!("Failed to launch Chromium: {}", e)))
}

struct BrowserResource {
    /// Keeps the driver process alive for the batch
    _playwright: Arc<Playwright>,
    browser: Browser,
    config: BrowserConfig,
    wait_timeout_ms: u64,
}

#[async_trait]
impl ExecutionResource for BrowserResource {
    async fn open_session(
        &self,
        spec: &TestSpecification,
    ) -> Result<Box<dyn Session>, StepError> {
        let context = self
            .browser
            .context_builder()
            .build()
            .await
            .map_err(|e| StepError::Session(format!("context for {}: {}", spec.id, e)))?;

        let page = context
            .new_page()
            .await
            .map_err(|e| StepError::Session(format!("page for {}: {}", spec.id, e)))?;

        page.set_viewport_size(Viewport {
            width: self.config.viewport_width as i32,
            height: self.config.viewport_height as i32,
        })
        .await
        .map_err(|e| StepError::Session(e.to_string()))?;

        Ok(Box::new(BrowserSession {
            spec_id: spec.id.clone(),
            context,
            page,
            settle_ms: self.config.settle_ms,
            wait_timeout_ms: self.wait_timeout_ms,
        }))
    }

    async fn shutdown(&self) -> Result<(), StepError> {
        self.browser
            .close()
            .await
            .map_err(|e| StepError::Launch(format!("Failed to close browser: {}", e)))?;
        log::info!("Browser service cleaned up");
        Ok(())
    }
}

struct BrowserSession {
    spec_id: String,
    context: BrowserContext,
    page: Page,
    settle_ms: u64,
    wait_timeout_ms: u64,
}

impl BrowserSession {
    async fn is_present(&self, selector: &str) -> bool {
        self.page
            .wait_for_selector_builder(selector)
            .timeout(self.wait_timeout_ms as f64)
            .wait_for_selector()
            .await
            .is_ok()
    }
}

#[async_trait]
impl Session for BrowserSession {
    async fn navigate(&mut self, target: &str) -> Result<(), StepError> {
        self.page
            .goto_builder(target)
            .goto()
            .await
            .map_err(|e| StepError::Navigation(format!("{}: {}", target, e)))?;

        if self.settle_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.settle_ms)).await;
        }
        Ok(())
    }

    async fn perform(&mut self, index: usize, step: &str) -> Result<StepOutcome, StepError> {
        let action = StepAction::parse(step);
        log::debug!("[{}] step {}: {:?}", self.spec_id, index + 1, action);

        let action_error = |e: String| StepError::Action {
            index: index + 1,
            message: e,
        };

        match action {
            StepAction::Navigate | StepAction::Observe => Ok(StepOutcome::Done),
            StepAction::Click { selector } => {
                self.page
                    .click_builder(&selector)
                    .click()
                    .await
                    .map_err(|e| action_error(format!("click '{}': {}", selector, e)))?;
                Ok(StepOutcome::Done)
            }
            StepAction::Type { selector, text } => {
                let element = self
                    .page
                    .query_selector(&selector)
                    .await
                    .map_err(|e| action_error(e.to_string()))?;
                match element {
                    Some(el) => el
                        .fill_builder(&text)
                        .fill()
                        .await
                        .map_err(|e| action_error(format!("fill '{}': {}", selector, e)))?,
                    None => self
                        .page
                        .keyboard
                        .input_text(&text)
                        .await
                        .map_err(|e| action_error(e.to_string()))?,
                }
                Ok(StepOutcome::Done)
            }
            StepAction::WaitForLoad => {
                if self.is_present("body").await {
                    Ok(StepOutcome::Done)
                } else {
                    Ok(StepOutcome::CheckFailed(format!(
                        "Page did not finish loading: {}",
                        step
                    )))
                }
            }
            StepAction::Wait { ms } => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(StepOutcome::Done)
            }
            StepAction::Verify {
                selector,
                description,
            } => {
                if self.is_present(&selector).await {
                    Ok(StepOutcome::Done)
                } else {
                    Ok(StepOutcome::CheckFailed(description))
                }
            }
        }
    }

    async fn capture(&mut self, path: &Path) -> Result<(), StepError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StepError::Capture(e.to_string()))?;
        }

        self.page
            .screenshot_builder()
            .path(path.to_path_buf())
            .full_page(true)
            .screenshot()
            .await
            .map_err(|e| StepError::Capture(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StepError> {
        let page = self.page.close(None).await;
        let context = self.context.close().await;
        page.and(context)
            .map_err(|e| StepError::Session(format!("close {}: {}", self.spec_id, e)))
    }
}
