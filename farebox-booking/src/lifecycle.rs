use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use farebox_core::booking::{Booking, BookingStatus, CheckInOutcome, CheckedInBooking};
use farebox_core::notify::{
    BookingEvent, CompanyNotice, NotificationDispatcher, TravellerNotice,
};
use farebox_core::trip::TripSummary;
use farebox_core::{token, Error, Result};
use farebox_store::booking_repo::BookingRepository;
use farebox_store::inventory::{self, SeatPool};
use farebox_store::{BookingRules, DbClient};

use crate::engine::{recipient_for, status_link};

/// Applies state transitions to existing bookings under per-booking
/// consistency rules. Inventory was debited at creation; the only write-back
/// path is the gated restoration on rejection.
pub struct LifecycleManager {
    pool: PgPool,
    rules: BookingRules,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl LifecycleManager {
    pub fn new(
        db: &DbClient,
        rules: BookingRules,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            pool: db.pool.clone(),
            rules,
            dispatcher,
        }
    }

    /// Company accepts a pending booking and gets a boarding QR issued.
    pub async fn accept_booking(
        &self,
        booking_id: Uuid,
        acting_company_id: Uuid,
    ) -> Result<Booking> {
        let mut tx = self.pool.begin().await?;

        let locked = BookingRepository::lock_with_trip(&mut tx, booking_id)
            .await?
            .ok_or(Error::BookingNotFound)?;
        if locked.company_id != acting_company_id {
            return Err(Error::Unauthorized);
        }
        ensure_transition(locked.booking.status, BookingStatus::Confirmed)?;

        // Distinct from the status token; the two must stay unlinkable.
        let qr_code_data = token::generate();
        BookingRepository::set_confirmed(&mut tx, booking_id, &qr_code_data).await?;

        tx.commit().await?;

        info!(booking_id = %booking_id, "booking accepted");

        let mut booking = locked.booking;
        booking.status = BookingStatus::Confirmed;
        booking.qr_code_data = Some(qr_code_data.clone());
        self.notify_traveller(
            BookingEvent::Accepted,
            &booking,
            &locked.trip,
            Some(qr_code_data),
        )
        .await;

        Ok(booking)
    }

    /// Company turns a pending booking down. Seats go back into both pools
    /// when restoration is enabled, atomically with the transition.
    pub async fn reject_booking(
        &self,
        booking_id: Uuid,
        acting_company_id: Uuid,
        reason: Option<&str>,
    ) -> Result<Booking> {
        let mut tx = self.pool.begin().await?;

        let locked = BookingRepository::lock_with_trip(&mut tx, booking_id)
            .await?
            .ok_or(Error::BookingNotFound)?;
        if locked.company_id != acting_company_id {
            return Err(Error::Unauthorized);
        }
        ensure_transition(locked.booking.status, BookingStatus::Rejected)?;

        if self.rules.restore_inventory_on_reject {
            let seats = locked.booking.seats_booked;
            inventory::credit(&mut tx, &SeatPool::Trip(locked.booking.trip_id), seats).await?;
            inventory::credit(&mut tx, &SeatPool::Fare(locked.booking.trip_fare_id), seats).await?;
        }
        BookingRepository::set_rejected(&mut tx, booking_id, reason).await?;

        tx.commit().await?;

        info!(
            booking_id = %booking_id,
            restored = self.rules.restore_inventory_on_reject,
            "booking rejected"
        );

        let mut booking = locked.booking;
        booking.status = BookingStatus::Rejected;
        booking.rejection_reason = reason.map(str::to_string);
        self.notify_traveller(BookingEvent::Rejected, &booking, &locked.trip, None)
            .await;

        Ok(booking)
    }

    /// Traveller asks to void a booking. Advisory only: the company resolves
    /// the request through its own tooling, and no inventory moves here.
    pub async fn request_cancellation(
        &self,
        booking_id: Uuid,
        requesting_user_id: Uuid,
    ) -> Result<Booking> {
        let mut tx = self.pool.begin().await?;

        let locked = BookingRepository::lock_with_trip(&mut tx, booking_id)
            .await?
            .ok_or(Error::BookingNotFound)?;
        if locked.booking.user_id != Some(requesting_user_id) {
            return Err(Error::Unauthorized);
        }
        if !locked.booking.status.accepts_cancellation_request() {
            return Err(Error::StateConflict {
                actual: locked.booking.status,
            });
        }
        if locked.trip.departure_at <= Utc::now() {
            return Err(Error::TripDeparted);
        }

        BookingRepository::set_status(&mut tx, booking_id, BookingStatus::CancellationRequested)
            .await?;

        tx.commit().await?;

        info!(booking_id = %booking_id, "cancellation requested");

        let mut booking = locked.booking;
        booking.status = BookingStatus::CancellationRequested;
        let company = CompanyNotice {
            event: BookingEvent::CancellationRequested,
            booking_id: booking.id,
            company_id: locked.company_id,
            trip: locked.trip.clone(),
            seats_booked: booking.seats_booked,
        };
        if let Err(err) = self.dispatcher.notify_company(&company).await {
            warn!(booking_id = %booking.id, "company notification failed: {err}");
        }

        Ok(booking)
    }

    /// Boarding-gate verification. The lookup matches QR data, operating
    /// company and `confirmed` status in one predicate; any miss reports
    /// invalid without saying why, and a booking checks in at most once.
    pub async fn verify_check_in(
        &self,
        qr_code_data: &str,
        acting_company_id: Uuid,
    ) -> Result<CheckInOutcome> {
        let mut tx = self.pool.begin().await?;

        let candidate =
            BookingRepository::lock_for_check_in(&mut tx, qr_code_data, acting_company_id).await?;
        let Some(candidate) = candidate else {
            tx.rollback().await?;
            return Ok(CheckInOutcome::invalid());
        };

        BookingRepository::set_status(&mut tx, candidate.booking_id, BookingStatus::CheckedIn)
            .await?;
        let passengers = BookingRepository::passengers(&mut *tx, candidate.booking_id).await?;

        tx.commit().await?;

        info!(booking_id = %candidate.booking_id, "passenger checked in");

        Ok(CheckInOutcome::valid(CheckedInBooking {
            booking_id: candidate.booking_id,
            passenger_names: passengers.into_iter().map(|p| p.passenger_name).collect(),
            seats: candidate.seats_booked,
            route: format!(
                "{} -> {}",
                candidate.origin_station, candidate.destination_station
            ),
            departure_at: candidate.departure_at,
        }))
    }

    async fn notify_traveller(
        &self,
        event: BookingEvent,
        booking: &Booking,
        trip: &TripSummary,
        qr_payload: Option<String>,
    ) {
        let Some(recipient) = recipient_for(booking) else {
            return;
        };
        let notice = TravellerNotice {
            event,
            booking_id: booking.id,
            recipient,
            trip: trip.clone(),
            status_url: status_link(&self.rules.status_link_base, &booking.status_token),
            qr_payload,
        };
        if let Err(err) = self.dispatcher.notify_traveller(&notice).await {
            warn!(booking_id = %booking.id, "traveller notification failed: {err}");
        }
    }
}

fn ensure_transition(from: BookingStatus, to: BookingStatus) -> Result<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(Error::StateConflict { actual: from })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_guard_rejects_illegal_moves() {
        assert!(ensure_transition(BookingStatus::Pending, BookingStatus::Confirmed).is_ok());
        assert!(ensure_transition(BookingStatus::Pending, BookingStatus::Rejected).is_ok());

        let err =
            ensure_transition(BookingStatus::Confirmed, BookingStatus::Rejected).unwrap_err();
        assert!(matches!(
            err,
            Error::StateConflict {
                actual: BookingStatus::Confirmed
            }
        ));
    }
}
