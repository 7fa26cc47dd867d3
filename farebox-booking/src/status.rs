use sqlx::PgPool;
use uuid::Uuid;

use farebox_core::booking::BookingStatusView;
use farebox_core::{Error, Result};
use farebox_store::booking_repo::BookingRepository;
use farebox_store::DbClient;

/// Read-only lookups. Token resolution takes no authentication; the token
/// itself is the capability, so nothing here may leak sequential ids.
pub struct StatusResolver {
    pool: PgPool,
}

impl StatusResolver {
    pub fn new(db: &DbClient) -> Self {
        Self {
            pool: db.pool.clone(),
        }
    }

    pub async fn resolve_by_token(&self, status_token: &str) -> Result<BookingStatusView> {
        BookingRepository::find_view_by_token(&self.pool, status_token)
            .await?
            .ok_or(Error::BookingNotFound)
    }

    pub async fn resolve_by_user(&self, user_id: Uuid) -> Result<Vec<BookingStatusView>> {
        BookingRepository::list_views_for_user(&self.pool, user_id).await
    }
}
