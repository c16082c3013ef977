//! HTTP routes.

pub mod generate;
pub mod health;
