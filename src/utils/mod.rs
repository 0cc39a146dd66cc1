pub mod constants;
pub mod progress;
pub mod retry;

pub use constants::*;
pub use progress::ProgressReporter;
pub use retry::{retry, RetryFailure, RetryPolicy, Sleeper, TokioSleeper};
