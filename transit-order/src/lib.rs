pub mod expiry;
pub mod lifecycle;
pub mod notifications;
pub mod registry;

pub use expiry::PendingBookingReaper;
pub use lifecycle::{BookingEngine, BookingError, EventEmitter};
pub use notifications::NotificationDispatcher;
pub use registry::{BookingRegistry, RegistryError};
