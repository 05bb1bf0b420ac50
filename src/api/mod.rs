//! HTTP API handlers

pub mod dropoffs;
pub mod transactions;
pub mod wallet;
pub mod waste_items;
pub mod webhooks;

use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

/// One-based page pagination shared by the list endpoints
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PaginationParams {
    /// Clamp to sane bounds and derive the row offset
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(10).clamp(1, 100);
        (page, limit, (page - 1) * limit)
    }
}

/// Metadata block for paginated list envelopes
pub fn pagination_meta(page: i64, limit: i64, total_items: i64) -> JsonValue {
    json!({
        "current_page": page,
        "total_pages": (total_items + limit - 1) / limit,
        "total_items": total_items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_page_of_ten() {
        let params = PaginationParams::default();
        assert_eq!(params.normalize(), (1, 10, 0));
    }

    #[test]
    fn offset_follows_page() {
        let params = PaginationParams {
            page: Some(3),
            limit: Some(25),
        };
        assert_eq!(params.normalize(), (3, 25, 50));
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let params = PaginationParams {
            page: Some(0),
            limit: Some(10_000),
        };
        assert_eq!(params.normalize(), (1, 100, 0));
        let params = PaginationParams {
            page: Some(-4),
            limit: Some(0),
        };
        assert_eq!(params.normalize(), (1, 1, 0));
    }

    #[test]
    fn meta_rounds_total_pages_up() {
        let meta = pagination_meta(1, 10, 31);
        assert_eq!(meta["total_pages"], 4);
        assert_eq!(meta["total_items"], 31);
        let meta = pagination_meta(1, 10, 0);
        assert_eq!(meta["total_pages"], 0);
    }
}
