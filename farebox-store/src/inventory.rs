//! The single seat-pool mutation primitive.
//!
//! The trip-level and fare-level counters are only ever written through
//! `debit` and `credit`, inside a transaction that has already taken the
//! corresponding row locks. No other code path may touch them.

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use farebox_core::{Error, PoolKind, Result};

/// Identifies one of the two nested seat pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatPool {
    Trip(Uuid),
    Fare(Uuid),
}

impl SeatPool {
    pub fn kind(&self) -> PoolKind {
        match self {
            SeatPool::Trip(_) => PoolKind::Trip,
            SeatPool::Fare(_) => PoolKind::Fare,
        }
    }

    fn id(&self) -> Uuid {
        match self {
            SeatPool::Trip(id) | SeatPool::Fare(id) => *id,
        }
    }
}

/// Take `quantity` seats out of a pool, or fail without changing it.
///
/// The guard is in the UPDATE itself (`seats_available >= $1`), so even a
/// caller that forgot the row lock cannot drive a counter negative. The
/// caller is still expected to hold the lock from its own SELECT ... FOR
/// UPDATE so that concurrent requests serialize per trip.
pub async fn debit(
    tx: &mut Transaction<'_, Postgres>,
    pool: &SeatPool,
    quantity: i32,
) -> Result<()> {
    let sql = match pool {
        SeatPool::Trip(_) => {
            "UPDATE trips
             SET seats_available = seats_available - $1, updated_at = NOW()
             WHERE id = $2 AND seats_available >= $1"
        }
        SeatPool::Fare(_) => {
            "UPDATE trip_fares
             SET seats_available = seats_available - $1, updated_at = NOW()
             WHERE id = $2 AND seats_available >= $1"
        }
    };

    let done = sqlx::query(sql)
        .bind(quantity)
        .bind(pool.id())
        .execute(&mut **tx)
        .await?;

    if done.rows_affected() == 1 {
        return Ok(());
    }

    // The row is locked by our own transaction, so re-reading the counter
    // here reports the exact shortfall the caller ran into.
    let available = current(tx, pool).await?;
    Err(Error::InventoryExhausted {
        pool: pool.kind(),
        requested: quantity,
        available,
    })
}

/// Put seats back into a pool. The trip pool is clamped to its capacity so
/// restoration can never exceed `seats_total`.
pub async fn credit(
    tx: &mut Transaction<'_, Postgres>,
    pool: &SeatPool,
    quantity: i32,
) -> Result<()> {
    let sql = match pool {
        SeatPool::Trip(_) => {
            "UPDATE trips
             SET seats_available = LEAST(seats_total, seats_available + $1), updated_at = NOW()
             WHERE id = $2"
        }
        SeatPool::Fare(_) => {
            "UPDATE trip_fares
             SET seats_available = seats_available + $1, updated_at = NOW()
             WHERE id = $2"
        }
    };

    let done = sqlx::query(sql)
        .bind(quantity)
        .bind(pool.id())
        .execute(&mut **tx)
        .await?;

    if done.rows_affected() != 1 {
        return Err(Error::Database(sqlx::Error::RowNotFound));
    }
    Ok(())
}

async fn current(tx: &mut Transaction<'_, Postgres>, pool: &SeatPool) -> Result<i32> {
    let sql = match pool {
        SeatPool::Trip(_) => "SELECT seats_available FROM trips WHERE id = $1",
        SeatPool::Fare(_) => "SELECT seats_available FROM trip_fares WHERE id = $1",
    };

    let (available,): (i32,) = sqlx::query_as(sql)
        .bind(pool.id())
        .fetch_one(&mut **tx)
        .await?;
    Ok(available)
}
