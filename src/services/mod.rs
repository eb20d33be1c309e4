// Service module exports

pub mod appointment;
pub mod config;
pub mod database;
pub mod grid_state;
pub mod loader;
pub mod timezone;
