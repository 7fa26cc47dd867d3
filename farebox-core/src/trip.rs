use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::Error;

/// One scheduled departure of a transport vehicle on a route.
///
/// `seats_available` is the trip-level seat pool; it is written only by the
/// store's seat-pool primitive inside a locked transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub route_id: Uuid,
    pub company_id: Uuid,
    pub origin_station: String,
    pub destination_station: String,
    pub departure_at: DateTime<Utc>,
    pub arrival_at: DateTime<Utc>,
    pub seats_total: i32,
    pub seats_available: i32,
    pub status: TripStatus,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Scheduled,
    Cancelled,
    Completed,
}

impl std::fmt::Display for TripStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TripStatus::Scheduled => "scheduled",
            TripStatus::Cancelled => "cancelled",
            TripStatus::Completed => "completed",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for TripStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(TripStatus::Scheduled),
            "cancelled" => Ok(TripStatus::Cancelled),
            "completed" => Ok(TripStatus::Completed),
            other => Err(Error::validation(format!("unknown trip status: {}", other))),
        }
    }
}

/// Compact trip projection embedded in status views and notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripSummary {
    pub trip_id: Uuid,
    pub origin_station: String,
    pub destination_station: String,
    pub departure_at: DateTime<Utc>,
    pub arrival_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trip_status_round_trips_through_strings() {
        for status in [TripStatus::Scheduled, TripStatus::Cancelled, TripStatus::Completed] {
            let parsed: TripStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("boarding".parse::<TripStatus>().is_err());
    }
}
