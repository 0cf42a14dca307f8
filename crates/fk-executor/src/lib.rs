pub mod builder;
pub mod executor;
pub mod lock;
pub mod stats;

pub use builder::build;
pub use executor::{
    CreateNodeExecutor, DeleteNodeExecutor, DeregisterSessionExecutor, Executor, ExecutorConfig,
    SetDataExecutor,
};
pub use lock::{acquire_lock, LockError, RetryPolicy};
pub use stats::{Phase, PhaseTimer, TimingStatistics};
