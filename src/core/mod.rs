pub mod stop;
pub mod utils;
pub mod verdict;

pub use stop::{StopReason, StopToken};
pub use verdict::Verdict;
