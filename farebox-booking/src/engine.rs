use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use farebox_core::booking::{
    Booking, BookingConfirmation, BookingPassenger, BookingRequest, BookingStatus,
};
use farebox_core::notify::{
    BookingEvent, CompanyNotice, NotificationDispatcher, Recipient, TravellerNotice,
};
use farebox_core::trip::{Trip, TripStatus, TripSummary};
use farebox_core::{token, Error, Result};
use farebox_store::booking_repo::BookingRepository;
use farebox_store::inventory::{self, SeatPool};
use farebox_store::trip_repo::TripRepository;
use farebox_store::{BookingRules, DbClient};

/// Turns a seat request into a durable, non-oversellable reservation.
///
/// All coordination happens through row locks: concurrent requests for the
/// same trip serialize on the trip row, then on the fare row. The
/// transaction stays free of network I/O; notifications go out after commit.
pub struct ReservationEngine {
    pool: PgPool,
    rules: BookingRules,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl ReservationEngine {
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

    pub async fn create_booking(&self, request: BookingRequest) -> Result<BookingConfirmation> {
        // Input checks run before the transaction opens; invalid requests
        // never take a lock.
        request.validate()?;

        let mut tx = self.pool.begin().await?;

        let trip = TripRepository::lock_trip(&mut tx, request.trip_id)
            .await?
            .ok_or(Error::TripNotFound)?;
        if trip.status != TripStatus::Scheduled {
            return Err(Error::validation("trip is not open for booking"));
        }
        inventory::debit(&mut tx, &SeatPool::Trip(trip.id), request.quantity).await?;

        let fare = TripRepository::lock_fare(&mut tx, trip.id, &request.fare)
            .await?
            .ok_or_else(|| Error::NoMatchingFare {
                category: request.fare.category.clone(),
                option: request.fare.option.clone(),
            })?;
        inventory::debit(&mut tx, &SeatPool::Fare(fare.id), request.quantity).await?;

        let total_price = fare.total_for(request.quantity)?;
        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            user_id: request.requester.user_id(),
            trip_id: trip.id,
            trip_fare_id: fare.id,
            status: BookingStatus::Pending,
            seats_booked: request.quantity,
            total_price,
            currency: fare.currency.clone(),
            guest: request.requester.guest().cloned(),
            status_token: token::generate(),
            qr_code_data: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };
        let passengers: Vec<BookingPassenger> = request
            .passenger_names
            .iter()
            .enumerate()
            .map(|(i, name)| BookingPassenger {
                booking_id: booking.id,
                seat_number: i as i32 + 1,
                passenger_name: name.trim().to_string(),
            })
            .collect();

        BookingRepository::create(&mut tx, &booking, &passengers).await?;

        tx.commit().await?;

        info!(
            booking_id = %booking.id,
            trip_id = %trip.id,
            seats = booking.seats_booked,
            "booking created"
        );

        let status_link = status_link(&self.rules.status_link_base, &booking.status_token);
        self.dispatch_created(&booking, &trip, &status_link).await;

        Ok(BookingConfirmation {
            booking,
            status_link,
        })
    }

    async fn dispatch_created(&self, booking: &Booking, trip: &Trip, status_link: &str) {
        let summary = TripSummary {
            trip_id: trip.id,
            origin_station: trip.origin_station.clone(),
            destination_station: trip.destination_station.clone(),
            departure_at: trip.departure_at,
            arrival_at: trip.arrival_at,
        };

        if let Some(recipient) = recipient_for(booking) {
            let notice = TravellerNotice {
                event: BookingEvent::Created,
                booking_id: booking.id,
                recipient,
                trip: summary.clone(),
                status_url: status_link.to_string(),
                qr_payload: None,
            };
            if let Err(err) = self.dispatcher.notify_traveller(&notice).await {
                warn!(booking_id = %booking.id, "traveller notification failed: {err}");
            }
        }

        let company = CompanyNotice {
            event: BookingEvent::Created,
            booking_id: booking.id,
            company_id: trip.company_id,
            trip: summary,
            seats_booked: booking.seats_booked,
        };
        if let Err(err) = self.dispatcher.notify_company(&company).await {
            warn!(booking_id = %booking.id, "company notification failed: {err}");
        }
    }
}

pub(crate) fn status_link(base: &str, status_token: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), status_token)
}

pub(crate) fn recipient_for(booking: &Booking) -> Option<Recipient> {
    match (booking.user_id, &booking.guest) {
        (Some(id), _) => Some(Recipient::User(id)),
        (None, Some(contact)) => Some(Recipient::Guest(contact.clone())),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_link_joins_base_and_token() {
        assert_eq!(
            status_link("http://localhost:3000/bookings/status", "abc"),
            "http://localhost:3000/bookings/status/abc"
        );
        assert_eq!(
            status_link("http://localhost:3000/bookings/status/", "abc"),
            "http://localhost:3000/bookings/status/abc"
        );
    }
}
