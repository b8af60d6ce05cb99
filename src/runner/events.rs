use super::state::{StatusObservation, SuitePhase};
use crate::model::Verdict;
use tokio::sync::broadcast;

/// Suite events for real-time updates
#[derive(Debug, Clone)]
pub enum SuiteEvent {
    PhaseChanged {
        task_id: String,
        status: StatusObservation,
    },

    // Planning and ranking
    CandidatesGenerated {
        task_id: String,
        count: usize,
    },
    TestsSelected {
        task_id: String,
        count: usize,
    },

    // Per-run events
    RunStarted {
        task_id: String,
        test_case_id: String,
        name: String,
    },
    RunFinished {
        task_id: String,
        test_case_id: String,
        verdict: Verdict,
        duration_ms: u64,
        error: Option<String>,
    },
}

/// Event emitter for broadcasting suite events
#[derive(Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<SuiteEvent>,
}

impl EventEmitter {
    /// Sending with no subscriber is not an error
    pub fn emit(&self, event: SuiteEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SuiteEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }
}

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration as StdDuration;

/// Console event listener for printing real-time updates
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<SuiteEvent>) {
        use colored::Colorize;
        use std::io::IsTerminal;

        let tty = std::io::stdout().is_terminal();
        let mut progress: Option<ProgressBar> = None;

        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("Console listener skipped {} events", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                SuiteEvent::PhaseChanged { task_id, status } => {
                    let glyph = match status.phase {
                        SuitePhase::Completed => "■".green().bold(),
                        SuitePhase::Failed => "✗".red().bold(),
                        _ => "▶".blue().bold(),
                    };
                    if status.phase.is_terminal() || status.phase == SuitePhase::Reporting {
                        if let Some(pb) = progress.take() {
                            pb.finish_and_clear();
                        }
                    }
                    println!(
                        "{} [{}] {}: {}",
                        glyph,
                        task_id.cyan(),
                        status.phase.as_str().white().bold(),
                        status.message
                    );
                }

                SuiteEvent::CandidatesGenerated { count, .. } => {
                    println!("  {} {} candidates generated", "→".blue(), count);
                }

                SuiteEvent::TestsSelected { count, .. } => {
                    println!("  {} {} tests selected for execution", "→".blue(), count);
                    let pb = ProgressBar::new(count as u64);
                    if !tty {
                        pb.set_draw_target(ProgressDrawTarget::hidden());
                    }
                    if let Ok(style) = ProgressStyle::default_bar()
                        .template("    {spinner} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                    {
                        pb.set_style(style.progress_chars("=> "));
                    }
                    pb.enable_steady_tick(StdDuration::from_millis(100));
                    progress = Some(pb);
                }

                SuiteEvent::RunStarted {
                    test_case_id, name, ..
                } => {
                    if let Some(pb) = &progress {
                        pb.set_message(format!("{} {}", test_case_id, name.dimmed()));
                    }
                }

                SuiteEvent::RunFinished {
                    test_case_id,
                    verdict,
                    duration_ms,
                    error,
                    ..
                } => {
                    let status_str = match verdict {
                        Verdict::Pass => "PASS".green().bold(),
                        Verdict::Fail => "FAIL".red().bold(),
                        Verdict::Error => "ERROR".yellow().bold(),
                    };
                    let mut line = format!(
                        "    [{}] {} ({}ms)",
                        status_str, test_case_id, duration_ms
                    );
                    if let Some(err) = error {
                        line.push_str(&format!(" {}", err.dimmed()));
                    }
                    match &progress {
                        Some(pb) => {
                            pb.println(line);
                            pb.inc(1);
                        }
                        None => println!("{}", line),
                    }
                }
            }
        }
    }
}
