//! Pure attendance arithmetic. Nothing here touches the disk or the clock.

pub mod attendance;
pub mod elapsed;
pub mod summary;
