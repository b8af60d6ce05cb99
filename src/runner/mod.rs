pub mod artifacts;
pub mod context;
pub mod coordinator;
pub mod events;
pub mod state;
pub mod test_runner;

pub use context::RunContext;
pub use coordinator::ExecutionCoordinator;
pub use events::*;
pub use state::*;
pub use test_runner::TestRunner;
