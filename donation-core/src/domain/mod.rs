//! Domain layer - entities and value objects
//!
//! This module contains the domain model of the donation flow: tokens,
//! chains, payments, balances and transfer records.

pub mod entities;

// Re-export domain components
pub use entities::*;
