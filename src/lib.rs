pub mod driver;
pub mod error;
pub mod llm;
pub mod model;
pub mod orchestrator;
pub mod planner;
pub mod ranker;
pub mod report;
pub mod runner;
pub mod utils;

// Re-export common items
pub use error::{LlmError, StepError, SuiteError};
pub use model::{Category, ExecutionResult, Priority, TestSpecification, Verdict};
pub use orchestrator::{Orchestrator, SuiteHandle, SuiteRequest};
pub use report::{generate_report, TestReport};
pub use utils::config::Config;
