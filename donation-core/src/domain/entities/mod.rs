//! Domain entities and value objects
//!
//! This module contains the core domain entities and value objects
//! that represent the business concepts of the donation flow.

pub mod token;
pub mod network;
pub mod payment;
pub mod balance;

// Re-export entities
pub use token::*;
pub use network::*;
pub use payment::*;
pub use balance::*;
