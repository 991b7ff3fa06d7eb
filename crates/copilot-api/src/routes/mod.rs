//! API routes

pub mod agents;
pub mod forecast;
pub mod health;
pub mod knowledge;
pub mod tickets;
