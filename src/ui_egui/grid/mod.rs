//! The appointment grid widget: one column per resource, one row per hour.

pub mod controller;
pub mod geometry;
pub mod gesture;
pub mod palette;
pub mod picking;
pub mod renderer;
pub mod scheduler;
pub mod scroll;
pub mod text_layout;
pub mod velocity;
pub mod widget;

pub use controller::{AppointmentGrid, ContextRequest, GridMessage};
pub use gesture::PointerEvent;
pub use widget::GridWidget;
