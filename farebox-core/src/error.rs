use crate::booking::BookingStatus;

/// Which seat pool an inventory failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    Trip,
    Fare,
}

impl std::fmt::Display for PoolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolKind::Trip => write!(f, "trip"),
            PoolKind::Fare => write!(f, "fare"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("trip not found")]
    TripNotFound,

    #[error("booking not found")]
    BookingNotFound,

    #[error("no fare matches {category}/{option} on this trip")]
    NoMatchingFare { category: String, option: String },

    #[error("not enough seats in the {pool} pool: requested {requested}, available {available}")]
    InventoryExhausted {
        pool: PoolKind,
        requested: i32,
        available: i32,
    },

    #[error("operation not allowed while booking is {actual}")]
    StateConflict { actual: BookingStatus },

    #[error("not authorized to act on this booking")]
    Unauthorized,

    #[error("trip has already departed")]
    TripDeparted,

    #[error("db error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}
