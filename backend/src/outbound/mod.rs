//! Outbound adapters implementing the domain's driven ports.
//!
//! - **persistence**: PostgreSQL repositories using Diesel.

pub mod persistence;
