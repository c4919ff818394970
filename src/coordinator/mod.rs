//! Write coordination
//!
//! [`Throttle`] keeps one parameter to a single in-flight write;
//! [`EqualizerSession`] routes every edit through the store, a throttle and
//! the command API.

pub mod session;
pub mod throttle;

pub use session::{EqualizerSession, WriteOutcome, WriteTarget};
pub use throttle::{Throttle, ThrottlePermit, ThrottledWrite};
