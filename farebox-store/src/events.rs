use async_trait::async_trait;
use tracing::info;

use farebox_core::notify::{CompanyNotice, NotificationDispatcher, TravellerNotice};

/// Dispatcher that records lifecycle notices in the log stream.
///
/// Stands in for the mail pipeline in development and tests; real delivery
/// lives with the surrounding service. Like every dispatcher it is invoked
/// after commit and its failures are swallowed by the caller.
#[derive(Clone, Default)]
pub struct LogDispatcher;

impl LogDispatcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn notify_traveller(
        &self,
        notice: &TravellerNotice,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(
            booking_id = %notice.booking_id,
            event = ?notice.event,
            status_url = %notice.status_url,
            has_qr = notice.qr_payload.is_some(),
            "traveller notification"
        );
        Ok(())
    }

    async fn notify_company(
        &self,
        notice: &CompanyNotice,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(
            booking_id = %notice.booking_id,
            company_id = %notice.company_id,
            event = ?notice.event,
            seats = notice.seats_booked,
            "company notification"
        );
        Ok(())
    }
}
