pub mod booking;
pub mod error;
pub mod fare;
pub mod notify;
pub mod token;
pub mod trip;

pub use error::{Error, PoolKind};

pub type Result<T> = std::result::Result<T, Error>;
