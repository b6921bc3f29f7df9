//! Protocol implementations.
//!
//! - `upcase`: line echo service that replies with the uppercased line

pub mod upcase;
