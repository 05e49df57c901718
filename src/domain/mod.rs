//! Domain layer: pure models, boundary arithmetic, and ports.

pub mod calendar;
pub mod errors;
pub mod models;
pub mod ports;

pub use calendar::{DataLayout, TraceDayCalendar};
pub use errors::{DomainError, DomainResult};
