pub mod booking;
pub mod events;
pub mod fleet;
pub mod notification;
pub mod trip;
