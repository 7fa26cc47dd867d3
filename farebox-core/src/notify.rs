use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::booking::GuestContact;
use crate::trip::TripSummary;

/// Lifecycle moments a dispatcher is told about.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingEvent {
    Created,
    Accepted,
    Rejected,
    CancellationRequested,
}

/// Where a traveller-facing message goes. Registered users are addressed by
/// id; resolving their mailbox is the dispatcher's concern.
#[derive(Debug, Clone, Serialize)]
pub enum Recipient {
    User(Uuid),
    Guest(GuestContact),
}

#[derive(Debug, Clone, Serialize)]
pub struct TravellerNotice {
    pub event: BookingEvent,
    pub booking_id: Uuid,
    pub recipient: Recipient,
    pub trip: TripSummary,
    pub status_url: String,
    /// Raw QR payload for the dispatcher to render; set on acceptance.
    pub qr_payload: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyNotice {
    pub event: BookingEvent,
    pub booking_id: Uuid,
    pub company_id: Uuid,
    pub trip: TripSummary,
    pub seats_booked: i32,
}

/// Outbound notification contract.
///
/// Implementations are fire-and-forget: the engine invokes them strictly
/// after commit and logs failures instead of surfacing them, so a broken
/// mail pipeline can never unwind a persisted booking.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify_traveller(
        &self,
        notice: &TravellerNotice,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn notify_company(
        &self,
        notice: &CompanyNotice,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
