//! The three stages of a distribution run.

pub mod collector;
pub mod dispatcher;
pub mod executor;
pub mod pool;

pub use collector::{Collector, CollectorExit};
pub use dispatcher::{Dispatcher, DispatcherHandle};
pub use executor::TaskExecutor;
pub use pool::WorkerPool;
