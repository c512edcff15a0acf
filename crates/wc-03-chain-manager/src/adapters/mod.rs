mod noop_executor;

pub use noop_executor::NoopExecutor;
