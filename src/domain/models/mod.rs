pub mod config;
pub mod context;
pub mod file_state;
pub mod tracked_error;
pub mod workflow_step;

pub use config::{CommandSpec, CommandsConfig, Config, GeneratorConfig, LoggingConfig, MigrationConfig};
pub use context::{EnrichedContext, ExampleMigration};
pub use file_state::{FileState, FileStatus, GateResult, RetryCounters, StateDelta};
pub use tracked_error::{ErrorStatus, ObservedFailure, TrackedError};
pub use workflow_step::WorkflowStep;
