// Utility module exports

pub mod clock;
pub mod date;
