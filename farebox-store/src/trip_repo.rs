use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use farebox_core::fare::{FareSelector, TripFare};
use farebox_core::trip::Trip;
use farebox_core::Result;

pub struct TripRepository;

#[derive(sqlx::FromRow)]
struct TripRow {
    id: Uuid,
    route_id: Uuid,
    company_id: Uuid,
    origin_station: String,
    destination_station: String,
    departure_at: DateTime<Utc>,
    arrival_at: DateTime<Utc>,
    seats_total: i32,
    seats_available: i32,
    status: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TripRow> for Trip {
    type Error = farebox_core::Error;

    fn try_from(row: TripRow) -> Result<Self> {
        Ok(Trip {
            id: row.id,
            route_id: row.route_id,
            company_id: row.company_id,
            origin_station: row.origin_station,
            destination_station: row.destination_station,
            departure_at: row.departure_at,
            arrival_at: row.arrival_at,
            seats_total: row.seats_total,
            seats_available: row.seats_available,
            status: row.status.parse()?,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct FareRow {
    id: Uuid,
    trip_id: Uuid,
    fare_category: String,
    booking_option: String,
    price: i64,
    currency: String,
    seats_available: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FareRow> for TripFare {
    fn from(row: FareRow) -> Self {
        TripFare {
            id: row.id,
            trip_id: row.trip_id,
            fare_category: row.fare_category,
            booking_option: row.booking_option,
            price: row.price,
            currency: row.currency,
            seats_available: row.seats_available,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl TripRepository {
    /// Lock the trip row for the rest of the transaction. Concurrent
    /// bookings for the same trip serialize here.
    pub async fn lock_trip(
        tx: &mut Transaction<'_, Postgres>,
        trip_id: Uuid,
    ) -> Result<Option<Trip>> {
        let row: Option<TripRow> = sqlx::query_as(
            "SELECT id, route_id, company_id, origin_station, destination_station,
                    departure_at, arrival_at, seats_total, seats_available, status,
                    is_active, created_at, updated_at
             FROM trips
             WHERE id = $1 AND is_active = TRUE
             FOR UPDATE",
        )
        .bind(trip_id)
        .fetch_optional(&mut **tx)
        .await?;

        row.map(Trip::try_from).transpose()
    }

    /// Lock the fare row matching the selector. Must be called after
    /// `lock_trip` so the lock order is the same in every transaction.
    pub async fn lock_fare(
        tx: &mut Transaction<'_, Postgres>,
        trip_id: Uuid,
        selector: &FareSelector,
    ) -> Result<Option<TripFare>> {
        let row: Option<FareRow> = sqlx::query_as(
            "SELECT id, trip_id, fare_category, booking_option, price, currency,
                    seats_available, created_at, updated_at
             FROM trip_fares
             WHERE trip_id = $1 AND fare_category = $2 AND booking_option = $3
             FOR UPDATE",
        )
        .bind(trip_id)
        .bind(&selector.category)
        .bind(&selector.option)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row.map(TripFare::from))
    }
}
