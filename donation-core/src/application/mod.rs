//! Application layer - use cases and ports
//!
//! Ports describe the wallet, chain reads and notice surface the core drives.
//! Use cases compose the core engines into the checkout flow.

pub mod ports;
pub mod use_cases;

pub use ports::*;
pub use use_cases::*;
