//! Request and response types that are not entity records.
//!
//! Entity bodies use the canonical shapes from `hometree_core::model`.

use hometree_core::EntityListQuery;
use serde::{Deserialize, Serialize};

/// `?skip=&limit=` window for list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub skip: u32,
    /// `Limit` is accepted for clients of the original users listing.
    #[serde(default, alias = "Limit")]
    pub limit: Option<u32>,
}

impl From<ListParams> for EntityListQuery {
    fn from(params: ListParams) -> Self {
        EntityListQuery::new(params.skip, params.limit)
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` when the database answers, `degraded` otherwise.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Whether the database answered a probe query.
    pub database: bool,
}
