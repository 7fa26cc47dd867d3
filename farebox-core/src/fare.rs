use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::Error;

pub const DEFAULT_FARE_CATEGORY: &str = "STANDARD";
pub const DEFAULT_BOOKING_OPTION: &str = "DEFAULT";

/// A priced sub-inventory of a trip, keyed by (fare category, booking option).
///
/// Carries its own seat pool, decremented together with the trip-level pool
/// in the same transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripFare {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub fare_category: String,
    pub booking_option: String,
    /// Per-seat price in minor currency units.
    pub price: i64,
    pub currency: String,
    pub seats_available: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TripFare {
    /// Flat per-seat multiplication; no proration, no tax.
    pub fn total_for(&self, quantity: i32) -> Result<i64, Error> {
        self.price
            .checked_mul(i64::from(quantity))
            .ok_or_else(|| Error::validation("total price overflows"))
    }
}

/// Selects a fare row on a trip by category and option codes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FareSelector {
    pub category: String,
    pub option: String,
}

impl Default for FareSelector {
    fn default() -> Self {
        Self {
            category: DEFAULT_FARE_CATEGORY.to_string(),
            option: DEFAULT_BOOKING_OPTION.to_string(),
        }
    }
}

impl FareSelector {
    pub fn new(category: impl Into<String>, option: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            option: option.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fare(price: i64) -> TripFare {
        let now = Utc::now();
        TripFare {
            id: Uuid::new_v4(),
            trip_id: Uuid::new_v4(),
            fare_category: DEFAULT_FARE_CATEGORY.to_string(),
            booking_option: DEFAULT_BOOKING_OPTION.to_string(),
            price,
            currency: "EUR".to_string(),
            seats_available: 10,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn total_is_flat_multiplication() {
        assert_eq!(fare(1000).total_for(2).unwrap(), 2000);
        assert_eq!(fare(0).total_for(5).unwrap(), 0);
    }

    #[test]
    fn total_overflow_is_rejected() {
        assert!(fare(i64::MAX).total_for(2).is_err());
    }

    #[test]
    fn default_selector_uses_standard_codes() {
        let selector = FareSelector::default();
        assert_eq!(selector.category, "STANDARD");
        assert_eq!(selector.option, "DEFAULT");
    }
}
