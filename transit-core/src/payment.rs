use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use transit_shared::Booking;

use crate::CoreResult;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOutcome {
    Succeeded,
    Declined,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub reference: String,
    pub booking_id: String,
    pub outcome: PaymentOutcome,
    pub processed_at: DateTime<Utc>,
}

#[async_trait]
pub trait PaymentAdapter: Send + Sync {
    /// Settle the seat charge for a pending booking.
    async fn process_payment(&self, booking: &Booking) -> CoreResult<PaymentReceipt>;
}

/// Approves every payment. There is no gateway integration.
pub struct MockPaymentAdapter;

#[async_trait]
impl PaymentAdapter for MockPaymentAdapter {
    async fn process_payment(&self, booking: &Booking) -> CoreResult<PaymentReceipt> {
        tracing::info!(booking_id = %booking.booking_id, "mock payment approved");
        Ok(PaymentReceipt {
            reference: format!("mock_pi_{}", booking.booking_id.to_lowercase()),
            booking_id: booking.booking_id.clone(),
            outcome: PaymentOutcome::Succeeded,
            processed_at: Utc::now(),
        })
    }
}
