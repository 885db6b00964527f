//! Testing utilities and harness for swipe-refresh

pub mod fakes;
pub mod harness;

pub use fakes::*;
pub use harness::{SwipeHarness, SwipeRobot, FRAME};

pub mod prelude {
    pub use crate::fakes::*;
    pub use crate::harness::{SwipeHarness, SwipeRobot, FRAME};
    pub use swipe_refresh_core::prelude::*;
}
