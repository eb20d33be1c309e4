// Module exports for models

pub mod appointment;
pub mod resource;
pub mod settings;
