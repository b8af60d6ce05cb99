//! Keyword interpretation of free-form step descriptions
//!
//! Generated steps are plain sentences ("Click on the hint button",
//! "Verify score is displayed"). A session maps each sentence onto one
//! concrete action; anything unrecognised becomes `StepAction::Observe`
//! and is treated as a no-op.

use regex::Regex;
use std::sync::OnceLock;

/// Concrete action derived from a step description
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    /// Navigation to the target is done before the first step
    Navigate,
    /// Click the first element matching a Playwright selector
    Click { selector: String },
    /// Type text into the focused or first matching input
    Type { selector: String, text: String },
    /// Wait until the document finished loading
    WaitForLoad,
    /// Fixed pause
    Wait { ms: u64 },
    /// Check that an element is visible
    Verify { selector: String, description: String },
    /// Nothing actionable
    Observe,
}

fn quoted_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""([^"]+)""#).expect("static regex"))
}

fn duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d+)\s*(ms|milliseconds?|s|secs?|seconds?)\b").expect("static regex")
    })
}

fn quoted_text(step: &str) -> Option<String> {
    quoted_regex()
        .captures(step)
        .map(|caps| caps[1].to_string())
}

fn wait_duration_ms(step: &str) -> Option<u64> {
    let caps = duration_regex().captures(step)?;
    let value: u64 = caps[1].parse().ok()?;
    if caps[2].starts_with("ms") || caps[2].starts_with("milli") {
        Some(value)
    } else {
        Some(value.saturating_mul(1000))
    }
}

const CHECK_VERBS: &[&str] = &["verify", "check", "ensure", "confirm", "assert"];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

impl StepAction {
    pub fn parse(step: &str) -> Self {
        let lower = step.to_lowercase();
        let quoted = quoted_text(step);

        // "Verify the game responds to clicks" is a check, not a click
        if CHECK_VERBS.iter().any(|v| lower.trim_start().starts_with(v)) {
            return Self::verify(step, &lower, quoted);
        }

        if contains_any(&lower, &["navigate", "open the", "go to", "visit"]) {
            return StepAction::Navigate;
        }

        if contains_any(&lower, &["type", "enter ", "input", "fill"]) {
            if let Some(text) = quoted {
                return StepAction::Type {
                    selector: "input, textarea, [contenteditable=\"true\"]".to_string(),
                    text,
                };
            }
        }

        if contains_any(&lower, &["click", "tap", "press", "select"]) {
            let selector = if let Some(text) = quoted {
                format!("text=\"{}\"", text)
            } else if contains_any(&lower, &["hint", "💡"]) {
                r#"button:has-text("💡"), button:has-text("hint"), [title*="hint"]"#.to_string()
            } else if lower.contains("new game") {
                r#"button:has-text("New Game"), button:has-text("Continue")"#.to_string()
            } else if contains_any(&lower, &["number", "tile", "cell"]) {
                ".number, .tile, .cell".to_string()
            } else if lower.contains("link") {
                "a".to_string()
            } else {
                "button".to_string()
            };
            return StepAction::Click { selector };
        }

        if contains_any(&lower, &["wait", "load"]) {
            if let Some(ms) = wait_duration_ms(&lower) {
                return StepAction::Wait { ms };
            }
            if lower.contains("page") {
                return StepAction::WaitForLoad;
            }
            return StepAction::Wait { ms: 2000 };
        }

        if contains_any(&lower, CHECK_VERBS) {
            return Self::verify(step, &lower, quoted);
        }

        StepAction::Observe
    }

    fn verify(step: &str, lower: &str, quoted: Option<String>) -> Self {
        let selector = if let Some(text) = quoted {
            format!("text=\"{}\"", text)
        } else if contains_any(lower, &["score", "points"]) {
            r#"[class*="score"], #score, .points"#.to_string()
        } else if contains_any(lower, &["board", "grid", "game"]) {
            ".game-board, .grid, canvas".to_string()
        } else if contains_any(lower, &["error", "alert", "warning"]) {
            r#"[role="alert"], .error, .alert"#.to_string()
        } else if lower.contains("title") || lower.contains("heading") {
            "h1, h2, title".to_string()
        } else {
            "body".to_string()
        };
        StepAction::Verify {
            selector,
            description: step.trim().to_string(),
        }
    }
}
