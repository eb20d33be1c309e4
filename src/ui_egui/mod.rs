mod app;
pub mod grid;

pub use app::AppointmentApp;
