//! Organization (tenant) model.

use folio_core::types::{DbId, EpochSecs};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `organizations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Organization {
    pub id: DbId,
    pub slug: String,
    pub name: String,
    pub created_at: EpochSecs,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrganization {
    pub slug: String,
    pub name: String,
}
