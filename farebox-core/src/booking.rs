use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::fare::FareSelector;
use crate::trip::TripSummary;
use crate::{Error, Result};

/// Booking lifecycle states.
///
/// `pending` is the entry state; `rejected`, `checked_in` and `cancelled`
/// are terminal for this engine. `cancellation_requested` is a holding state
/// resolved by out-of-band company tooling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Rejected,
    CancellationRequested,
    CheckedIn,
    Cancelled,
}

impl BookingStatus {
    /// Legal transitions of the lifecycle state machine.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Rejected)
                | (Pending, CancellationRequested)
                | (Confirmed, CancellationRequested)
                | (Confirmed, CheckedIn)
                | (CancellationRequested, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        use BookingStatus::*;
        matches!(self, Rejected | CheckedIn | Cancelled)
    }

    /// States from which a traveller may still ask to cancel.
    pub fn accepts_cancellation_request(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Rejected => "rejected",
            BookingStatus::CancellationRequested => "cancellation_requested",
            BookingStatus::CheckedIn => "checked_in",
            BookingStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "rejected" => Ok(BookingStatus::Rejected),
            "cancellation_requested" => Ok(BookingStatus::CancellationRequested),
            "checked_in" => Ok(BookingStatus::CheckedIn),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(Error::validation(format!("unknown booking status: {}", other))),
        }
    }
}

/// Contact details for a booking made without an account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuestContact {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl GuestContact {
    /// Completeness plus a shape check on the email. Runs before any lock is
    /// taken, so invalid input never touches inventory.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("guest name is required"));
        }
        if self.phone.trim().is_empty() {
            return Err(Error::validation("guest phone is required"));
        }
        if !is_plausible_email(&self.email) {
            return Err(Error::validation(format!(
                "guest email is not a valid address: {}",
                self.email
            )));
        }
        Ok(())
    }
}

fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let Some(domain) = parts.next() else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Who is asking for the reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Requester {
    User(Uuid),
    Guest(GuestContact),
}

impl Requester {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Requester::User(id) => Some(*id),
            Requester::Guest(_) => None,
        }
    }

    pub fn guest(&self) -> Option<&GuestContact> {
        match self {
            Requester::User(_) => None,
            Requester::Guest(contact) => Some(contact),
        }
    }
}

/// Input to the reservation engine.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub trip_id: Uuid,
    #[serde(default)]
    pub fare: FareSelector,
    pub quantity: i32,
    pub requester: Requester,
    pub passenger_names: Vec<String>,
}

impl BookingRequest {
    /// All input checks that must pass before the transaction opens.
    pub fn validate(&self) -> Result<()> {
        if self.quantity < 1 {
            return Err(Error::validation("quantity must be at least 1"));
        }
        if self.passenger_names.len() != self.quantity as usize {
            return Err(Error::validation(format!(
                "expected {} passenger name(s), got {}",
                self.quantity,
                self.passenger_names.len()
            )));
        }
        if self.passenger_names.iter().any(|n| n.trim().is_empty()) {
            return Err(Error::validation("passenger names must not be empty"));
        }
        if let Requester::Guest(contact) = &self.requester {
            contact.validate()?;
        }
        Ok(())
    }
}

/// A reservation of one or more seats on a trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub trip_id: Uuid,
    pub trip_fare_id: Uuid,
    pub status: BookingStatus,
    pub seats_booked: i32,
    /// Minor currency units.
    pub total_price: i64,
    pub currency: String,
    pub guest: Option<GuestContact>,
    /// Capability token for unauthenticated status lookup.
    pub status_token: String,
    /// Capability token rendered as a boarding QR code; set on confirmation.
    pub qr_code_data: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One named seat inside a booking. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookingPassenger {
    pub booking_id: Uuid,
    /// 1-based, unique within the booking.
    pub seat_number: i32,
    pub passenger_name: String,
}

/// What the reservation engine hands back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct BookingConfirmation {
    pub booking: Booking,
    pub status_link: String,
}

/// Booking + trip + passenger projection served by the status resolver.
#[derive(Debug, Clone, Serialize)]
pub struct BookingStatusView {
    pub booking_id: Uuid,
    pub status: BookingStatus,
    pub seats_booked: i32,
    pub total_price: i64,
    pub currency: String,
    pub trip: TripSummary,
    pub passengers: Vec<BookingPassenger>,
    pub created_at: DateTime<Utc>,
}

/// Result of a boarding QR verification. A miss carries no reason.
#[derive(Debug, Clone, Serialize)]
pub struct CheckInOutcome {
    pub valid: bool,
    pub booking: Option<CheckedInBooking>,
}

impl CheckInOutcome {
    pub fn invalid() -> Self {
        Self {
            valid: false,
            booking: None,
        }
    }

    pub fn valid(booking: CheckedInBooking) -> Self {
        Self {
            valid: true,
            booking: Some(booking),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckedInBooking {
    pub booking_id: Uuid,
    pub passenger_names: Vec<String>,
    pub seats: i32,
    pub route: String,
    pub departure_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_transitions() {
        use BookingStatus::*;

        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Pending.can_transition_to(CancellationRequested));
        assert!(Confirmed.can_transition_to(CheckedIn));
        assert!(Confirmed.can_transition_to(CancellationRequested));
        assert!(CancellationRequested.can_transition_to(Cancelled));

        // No path out of the terminal states.
        for terminal in [Rejected, CheckedIn, Cancelled] {
            assert!(terminal.is_terminal());
            for next in [Pending, Confirmed, Rejected, CancellationRequested, CheckedIn, Cancelled] {
                assert!(!terminal.can_transition_to(next));
            }
        }

        // No re-confirmation, no skipping pending.
        assert!(!Confirmed.can_transition_to(Confirmed));
        assert!(!Confirmed.can_transition_to(Rejected));
        assert!(!Pending.can_transition_to(CheckedIn));
    }

    #[test]
    fn status_round_trips_through_strings() {
        use BookingStatus::*;
        for status in [Pending, Confirmed, Rejected, CancellationRequested, CheckedIn, Cancelled] {
            let parsed: BookingStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("paid".parse::<BookingStatus>().is_err());
    }

    fn guest() -> GuestContact {
        GuestContact {
            name: "Ada Byron".to_string(),
            email: "ada@example.com".to_string(),
            phone: "+3361234567".to_string(),
        }
    }

    #[test]
    fn guest_contact_requires_all_fields() {
        assert!(guest().validate().is_ok());

        let mut missing_name = guest();
        missing_name.name = "  ".to_string();
        assert!(missing_name.validate().is_err());

        let mut missing_phone = guest();
        missing_phone.phone = String::new();
        assert!(missing_phone.validate().is_err());
    }

    #[test]
    fn guest_email_shape_is_checked() {
        for bad in ["", "ada", "ada@", "@example.com", "ada@example", "ada@.com", "ada@example."] {
            let mut contact = guest();
            contact.email = bad.to_string();
            assert!(contact.validate().is_err(), "accepted {:?}", bad);
        }
    }

    fn request(quantity: i32, names: &[&str]) -> BookingRequest {
        BookingRequest {
            trip_id: Uuid::new_v4(),
            fare: FareSelector::default(),
            quantity,
            requester: Requester::Guest(guest()),
            passenger_names: names.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn request_quantity_must_be_positive() {
        assert!(request(0, &[]).validate().is_err());
        assert!(request(-2, &[]).validate().is_err());
        assert!(request(1, &["Ada Byron"]).validate().is_ok());
    }

    #[test]
    fn request_requires_exact_passenger_list() {
        assert!(request(2, &["Ada Byron"]).validate().is_err());
        assert!(request(1, &["Ada Byron", "Alan Turing"]).validate().is_err());
        assert!(request(2, &["Ada Byron", "Alan Turing"]).validate().is_ok());
        assert!(request(2, &["Ada Byron", " "]).validate().is_err());
    }

    #[test]
    fn authenticated_request_skips_guest_checks() {
        let mut req = request(1, &["Ada Byron"]);
        req.requester = Requester::User(Uuid::new_v4());
        assert!(req.validate().is_ok());
    }
}
