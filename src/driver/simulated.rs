//! Simulated step executor
//!
//! Runs without a browser: steps are paced with timers, verdicts are drawn
//! from a (seedable) random source and screenshots are placeholder PNGs.

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::action::StepAction;
use super::traits::{ExecutionResource, Session, StepExecutor, StepOutcome};
use crate::error::StepError;
use crate::model::TestSpecification;
use crate::utils::config::SimulationConfig;

const FRAME_WIDTH: u32 = 800;
const FRAME_HEIGHT: u32 = 600;

pub struct SimulatedExecutor {
    config: SimulationConfig,
    rng: Arc<Mutex<StdRng>>,
}

impl SimulatedExecutor {
    pub fn new(config: SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng: Arc::new(Mutex::new(rng)),
        }
    }
}

#[async_trait]
impl StepExecutor for SimulatedExecutor {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn launch(&self) -> Result<Box<dyn ExecutionResource>, StepError> {
        log::info!("Simulated browser initialized");
        Ok(Box::new(SimulatedBrowser {
            config: self.config.clone(),
            rng: self.rng.clone(),
        }))
    }
}

struct SimulatedBrowser {
    config: SimulationConfig,
    rng: Arc<Mutex<StdRng>>,
}

#[async_trait]
impl ExecutionResource for SimulatedBrowser {
    async fn open_session(
        &self,
        spec: &TestSpecification,
    ) -> Result<Box<dyn Session>, StepError> {
        Ok(Box::new(SimulatedSession {
            spec_id: spec.id.clone(),
            config: self.config.clone(),
            rng: self.rng.clone(),
            frames: 0,
        }))
    }

    async fn shutdown(&self) -> Result<(), StepError> {
        log::info!("Simulated browser cleaned up");
        Ok(())
    }
}

struct SimulatedSession {
    spec_id: String,
    config: SimulationConfig,
    rng: Arc<Mutex<StdRng>>,
    frames: u32,
}

#[async_trait]
impl Session for SimulatedSession {
    async fn navigate(&mut self, target: &str) -> Result<(), StepError> {
        log::debug!("[{}] simulating navigation to {}", self.spec_id, target);
        tokio::time::sleep(Duration::from_millis(self.config.start_delay_ms)).await;
        Ok(())
    }

    async fn perform(&mut self, index: usize, step: &str) -> Result<StepOutcome, StepError> {
        let action = StepAction::parse(step);
        log::debug!(
            "[{}] step {}: {:?} ({})",
            self.spec_id,
            index + 1,
            action,
            step
        );
        tokio::time::sleep(Duration::from_millis(self.config.step_delay_ms)).await;
        Ok(StepOutcome::Done)
    }

    async fn verify(&mut self, spec: &TestSpecification) -> Result<Vec<String>, StepError> {
        let roll: f64 = self.rng.lock().gen();
        if roll < self.config.failure_rate {
            let missed = spec
                .validation_criteria
                .first()
                .cloned()
                .unwrap_or_else(|| "Simulated test failure".to_string());
            return Ok(vec![missed]);
        }
        Ok(Vec::new())
    }

    async fn capture(&mut self, path: &Path) -> Result<(), StepError> {
        self.frames += 1;
        let shade = (self.frames * 24 % 120) as u8;
        let path = path.to_path_buf();

        tokio::task::spawn_blocking(move || render_placeholder(&path, shade))
            .await
            .map_err(|e| StepError::Capture(e.to_string()))?
    }

    async fn close(&mut self) -> Result<(), StepError> {
        Ok(())
    }
}

/// Light background with a header band; the band shade varies per frame
fn render_placeholder(path: &Path, shade: u8) -> Result<(), StepError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StepError::Capture(e.to_string()))?;
    }

    let mut img = RgbImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, Rgb([232, 244, 253]));
    for y in 0..80 {
        for x in 0..FRAME_WIDTH {
            img.put_pixel(x, y, Rgb([74, 144u8.saturating_sub(shade), 226]));
        }
    }

    img.save(path)
        .map_err(|e| StepError::Capture(format!("{}: {}", path.display(), e)))
}
