//! Data models for Counselbook

mod availability;
mod booking;
mod screening;
mod session;
mod slot;

pub use availability::*;
pub use booking::*;
pub use screening::*;
pub use session::*;
pub use slot::*;
