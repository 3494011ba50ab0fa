//! Application use cases

pub mod checkout;

pub use checkout::*;
