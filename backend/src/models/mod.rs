//! Data models shared across database access and API handlers.

pub mod prediction;
pub mod prediction_history;

/// Number of pages needed to show `total` items, `limit` per page.
///
/// Zero items means zero pages.
pub fn total_pages(total: i64, limit: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    let limit = limit.max(1);
    (total + limit - 1) / limit
}
