//! Frame timing.
//!
//! One `FrameClock` per render loop; call `tick()` once per presented frame.

mod clock;

pub use clock::{FrameClock, FrameTime};
