//! Pagination utilities for service layer
//!
//! Provides a simple `Pagination` struct and helpers to normalize inputs.

use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, Select};
use serde::Deserialize;

pub use common::types::Paged;

use crate::errors::ServiceError;

/// Pagination parameters
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Pagination {
    /// 1-based page index
    #[serde(default = "default_page")]
    pub page: u32,
    /// items per page
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 { 1 }
fn default_per_page() -> u32 { 20 }

impl Pagination {
    /// Clamp to sane defaults and convert to `u64`: (0-based page index, page size)
    pub fn normalize(self) -> (u64, u64) {
        let page = if self.page == 0 { 1 } else { self.page };
        let per_page = self.per_page.clamp(1, 100);
        ((page - 1) as u64, per_page as u64)
    }

    /// Wrap one fetched page into the response envelope.
    pub fn page_of<T>(self, items: Vec<T>, total: u64) -> Paged<T> {
        let (idx, per_page) = self.normalize();
        Paged { items, page: idx + 1, per_page, total }
    }
}

/// Count and fetch one page of `select`.
pub async fn fetch_page<'db, C, E>(db: &'db C, select: Select<E>, opts: Pagination) -> Result<Paged<E::Model>, ServiceError>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: Sync + 'db,
{
    let (page_idx, per_page) = opts.normalize();
    // SeaORM's paginate uses 0-based page index internally via fetch_page
    let paginator = select.paginate(db, per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page_idx).await?;
    Ok(opts.page_of(items, total))
}

impl Default for Pagination {
    fn default() -> Self { Self { page: default_page(), per_page: default_per_page() } }
}

#[cfg(test)]
mod tests {
    use super::Pagination;

    #[test]
    fn normalize_clamps_zero_to_defaults() {
        let (idx, per) = Pagination { page: 0, per_page: 0 }.normalize();
        assert_eq!(idx, 0);
        assert_eq!(per, 1);
    }

    #[test]
    fn normalize_clamps_upper_bound() {
        let (idx, per) = Pagination { page: 5, per_page: 1000 }.normalize();
        assert_eq!(idx, 4);
        assert_eq!(per, 100);
    }

    #[test]
    fn default_values_are_sane() {
        let d = Pagination::default();
        assert_eq!(d.page, 1);
        assert_eq!(d.per_page, 20);
    }

    #[test]
    fn page_of_reports_normalized_values() {
        let p = Pagination { page: 0, per_page: 500 }.page_of(vec![1, 2, 3], 42);
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, 100);
        assert_eq!(p.total, 42);
        assert_eq!(p.items.len(), 3);
    }
}
