use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::lifecycle::BookingEngine;

/// Periodically releases seats held by bookings that were never paid.
pub struct PendingBookingReaper {
    engine: BookingEngine,
    ttl: chrono::Duration,
    interval: Duration,
}

impl PendingBookingReaper {
    pub fn new(engine: BookingEngine, ttl: chrono::Duration, interval: Duration) -> Self {
        Self {
            engine,
            ttl,
            interval,
        }
    }

    /// Expires every pending booking created before `now - ttl` and returns
    /// how many were released.
    pub async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = now.checked_sub_signed(self.ttl) else {
            return 0;
        };
        let stale = match self.engine.stale_pending(cutoff).await {
            Ok(stale) => stale,
            Err(e) => {
                error!("Reaper could not list pending bookings: {}", e);
                return 0;
            }
        };

        let mut expired = 0;
        for booking in stale {
            match self.engine.expire_booking(&booking.booking_id).await {
                Ok(Some(_)) => expired += 1,
                Ok(None) => {}
                Err(e) => warn!("Could not expire booking {}: {}", booking.booking_id, e),
            }
        }
        if expired > 0 {
            info!("Expired {} unpaid booking(s)", expired);
        }
        expired
    }

    pub async fn run(self) {
        info!(
            "Pending booking reaper started (ttl {}s, every {:?})",
            self.ttl.num_seconds(),
            self.interval
        );
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.sweep(Utc::now()).await;
        }
    }
}
