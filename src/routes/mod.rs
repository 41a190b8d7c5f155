//! Gateway routes

pub mod health;
pub mod proxy;
