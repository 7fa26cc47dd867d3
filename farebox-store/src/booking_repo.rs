use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use farebox_core::booking::{
    Booking, BookingPassenger, BookingStatus, BookingStatusView, GuestContact,
};
use farebox_core::trip::TripSummary;
use farebox_core::Result;

pub struct BookingRepository;

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Option<Uuid>,
    trip_id: Uuid,
    trip_fare_id: Uuid,
    booking_status: String,
    seats_booked: i32,
    total_price: i64,
    currency: String,
    guest_name: Option<String>,
    guest_email: Option<String>,
    guest_phone: Option<String>,
    status_token: String,
    qr_code_data: Option<String>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = farebox_core::Error;

    fn try_from(row: BookingRow) -> Result<Self> {
        let guest = match (row.guest_name, row.guest_email, row.guest_phone) {
            (Some(name), Some(email), Some(phone)) => Some(GuestContact { name, email, phone }),
            _ => None,
        };
        Ok(Booking {
            id: row.id,
            user_id: row.user_id,
            trip_id: row.trip_id,
            trip_fare_id: row.trip_fare_id,
            status: row.booking_status.parse()?,
            seats_booked: row.seats_booked,
            total_price: row.total_price,
            currency: row.currency,
            guest,
            status_token: row.status_token,
            qr_code_data: row.qr_code_data,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const BOOKING_COLUMNS: &str =
    "b.id, b.user_id, b.trip_id, b.trip_fare_id, b.booking_status, b.seats_booked,
     b.total_price, b.currency, b.guest_name, b.guest_email, b.guest_phone,
     b.status_token, b.qr_code_data, b.rejection_reason, b.created_at, b.updated_at";

/// A booking locked together with the trip facts the lifecycle checks need.
pub struct LockedBooking {
    pub booking: Booking,
    pub company_id: Uuid,
    pub trip: TripSummary,
}

#[derive(sqlx::FromRow)]
struct LockedBookingRow {
    id: Uuid,
    user_id: Option<Uuid>,
    trip_id: Uuid,
    trip_fare_id: Uuid,
    booking_status: String,
    seats_booked: i32,
    total_price: i64,
    currency: String,
    guest_name: Option<String>,
    guest_email: Option<String>,
    guest_phone: Option<String>,
    status_token: String,
    qr_code_data: Option<String>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    company_id: Uuid,
    origin_station: String,
    destination_station: String,
    trip_departure_at: DateTime<Utc>,
    trip_arrival_at: DateTime<Utc>,
}

impl TryFrom<LockedBookingRow> for LockedBooking {
    type Error = farebox_core::Error;

    fn try_from(row: LockedBookingRow) -> Result<Self> {
        let trip = TripSummary {
            trip_id: row.trip_id,
            origin_station: row.origin_station,
            destination_station: row.destination_station,
            departure_at: row.trip_departure_at,
            arrival_at: row.trip_arrival_at,
        };
        let company_id = row.company_id;
        let booking = BookingRow {
            id: row.id,
            user_id: row.user_id,
            trip_id: row.trip_id,
            trip_fare_id: row.trip_fare_id,
            booking_status: row.booking_status,
            seats_booked: row.seats_booked,
            total_price: row.total_price,
            currency: row.currency,
            guest_name: row.guest_name,
            guest_email: row.guest_email,
            guest_phone: row.guest_phone,
            status_token: row.status_token,
            qr_code_data: row.qr_code_data,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
        .try_into()?;

        Ok(LockedBooking {
            booking,
            company_id,
            trip,
        })
    }
}

/// What a boarding-gate scan matched, before the status flip.
#[derive(sqlx::FromRow)]
pub struct CheckInCandidate {
    pub booking_id: Uuid,
    pub seats_booked: i32,
    pub origin_station: String,
    pub destination_station: String,
    pub departure_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ViewRow {
    booking_id: Uuid,
    booking_status: String,
    seats_booked: i32,
    total_price: i64,
    currency: String,
    created_at: DateTime<Utc>,
    trip_id: Uuid,
    origin_station: String,
    destination_station: String,
    departure_at: DateTime<Utc>,
    arrival_at: DateTime<Utc>,
}

impl ViewRow {
    fn into_view(self, passengers: Vec<BookingPassenger>) -> Result<BookingStatusView> {
        Ok(BookingStatusView {
            booking_id: self.booking_id,
            status: self.booking_status.parse()?,
            seats_booked: self.seats_booked,
            total_price: self.total_price,
            currency: self.currency,
            trip: TripSummary {
                trip_id: self.trip_id,
                origin_station: self.origin_station,
                destination_station: self.destination_station,
                departure_at: self.departure_at,
                arrival_at: self.arrival_at,
            },
            passengers,
            created_at: self.created_at,
        })
    }
}

const VIEW_QUERY: &str =
    "SELECT b.id AS booking_id, b.booking_status, b.seats_booked, b.total_price,
            b.currency, b.created_at, t.id AS trip_id, t.origin_station,
            t.destination_station, t.departure_at, t.arrival_at
     FROM bookings b
     JOIN trips t ON t.id = b.trip_id";

impl BookingRepository {
    /// Insert the booking and its passenger rows inside the caller's
    /// transaction.
    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        booking: &Booking,
        passengers: &[BookingPassenger],
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO bookings
                 (id, user_id, trip_id, trip_fare_id, booking_status, seats_booked,
                  total_price, currency, guest_name, guest_email, guest_phone,
                  status_token, qr_code_data, rejection_reason, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.trip_id)
        .bind(booking.trip_fare_id)
        .bind(booking.status.to_string())
        .bind(booking.seats_booked)
        .bind(booking.total_price)
        .bind(&booking.currency)
        .bind(booking.guest.as_ref().map(|g| g.name.clone()))
        .bind(booking.guest.as_ref().map(|g| g.email.clone()))
        .bind(booking.guest.as_ref().map(|g| g.phone.clone()))
        .bind(&booking.status_token)
        .bind(&booking.qr_code_data)
        .bind(&booking.rejection_reason)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut **tx)
        .await?;

        for passenger in passengers {
            sqlx::query(
                "INSERT INTO booking_passengers (booking_id, seat_number, passenger_name)
                 VALUES ($1, $2, $3)",
            )
            .bind(passenger.booking_id)
            .bind(passenger.seat_number)
            .bind(&passenger.passenger_name)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    /// Lock one booking row and read the trip facts alongside it.
    pub async fn lock_with_trip(
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
    ) -> Result<Option<LockedBooking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS}, t.company_id, t.origin_station, t.destination_station,
                    t.departure_at AS trip_departure_at, t.arrival_at AS trip_arrival_at
             FROM bookings b
             JOIN trips t ON t.id = b.trip_id
             WHERE b.id = $1
             FOR UPDATE OF b"
        );
        let row: Option<LockedBookingRow> = sqlx::query_as(&sql)
            .bind(booking_id)
            .fetch_optional(&mut **tx)
            .await?;

        row.map(LockedBooking::try_from).transpose()
    }

    pub async fn set_status(
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> Result<()> {
        sqlx::query("UPDATE bookings SET booking_status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status.to_string())
            .bind(booking_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn set_confirmed(
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
        qr_code_data: &str,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE bookings
             SET booking_status = $1, qr_code_data = $2, updated_at = NOW()
             WHERE id = $3",
        )
        .bind(BookingStatus::Confirmed.to_string())
        .bind(qr_code_data)
        .bind(booking_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn set_rejected(
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
        reason: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE bookings
             SET booking_status = $1, rejection_reason = $2, updated_at = NOW()
             WHERE id = $3",
        )
        .bind(BookingStatus::Rejected.to_string())
        .bind(reason)
        .bind(booking_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// One shot: the match predicate bakes in company ownership and the
    /// `confirmed` status, so a second scan of the same QR finds nothing.
    pub async fn lock_for_check_in(
        tx: &mut Transaction<'_, Postgres>,
        qr_code_data: &str,
        company_id: Uuid,
    ) -> Result<Option<CheckInCandidate>> {
        let row: Option<CheckInCandidate> = sqlx::query_as(
            "SELECT b.id AS booking_id, b.seats_booked, t.origin_station,
                    t.destination_station, t.departure_at
             FROM bookings b
             JOIN trips t ON t.id = b.trip_id
             WHERE b.qr_code_data = $1 AND t.company_id = $2 AND b.booking_status = $3
             FOR UPDATE OF b",
        )
        .bind(qr_code_data)
        .bind(company_id)
        .bind(BookingStatus::Confirmed.to_string())
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row)
    }

    pub async fn passengers<'e, E>(executor: E, booking_id: Uuid) -> Result<Vec<BookingPassenger>>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let rows: Vec<(Uuid, i32, String)> = sqlx::query_as(
            "SELECT booking_id, seat_number, passenger_name
             FROM booking_passengers
             WHERE booking_id = $1
             ORDER BY seat_number",
        )
        .bind(booking_id)
        .fetch_all(executor)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(booking_id, seat_number, passenger_name)| BookingPassenger {
                booking_id,
                seat_number,
                passenger_name,
            })
            .collect())
    }

    /// Indexed lookup by the opaque status token. Read-only, no locks.
    pub async fn find_view_by_token(
        pool: &PgPool,
        token: &str,
    ) -> Result<Option<BookingStatusView>> {
        let sql = format!("{VIEW_QUERY} WHERE b.status_token = $1");
        let row: Option<ViewRow> = sqlx::query_as(&sql)
            .bind(token)
            .fetch_optional(pool)
            .await?;

        match row {
            Some(row) => {
                let passengers = Self::passengers(pool, row.booking_id).await?;
                Ok(Some(row.into_view(passengers)?))
            }
            None => Ok(None),
        }
    }

    /// All bookings of one user, most recent first.
    pub async fn list_views_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<BookingStatusView>> {
        let sql = format!("{VIEW_QUERY} WHERE b.user_id = $1 ORDER BY b.created_at DESC");
        let rows: Vec<ViewRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await?;

        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            let passengers = Self::passengers(pool, row.booking_id).await?;
            views.push(row.into_view(passengers)?);
        }
        Ok(views)
    }
}
