pub mod models;
pub mod pii;

pub use models::booking::{Booking, PaymentStatus};
pub use models::events::{CancellationReason, DomainEvent};
pub use models::fleet::{Bus, BusType, Operator, Route};
pub use models::notification::{Notification, NotificationCategory};
pub use models::trip::{SeatRejection, Trip, TripPlan, TripSchedule, TripStatus};
