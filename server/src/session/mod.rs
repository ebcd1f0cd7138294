pub mod service;
pub mod sweeper;

pub use service::{now_ms, IssuedToken, TokenService};
pub use sweeper::{ExpirySweeper, SweepReport};
