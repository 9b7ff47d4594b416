//! Paging, search and sort state of the collection table.

use crate::api::CollectionClient;
use crate::cache::Subscription;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    normalize_search, CollectionPage, CollectionQuery, ReleaseReceipt, SortBy, SortDir, PAGE_SIZES,
};

/// Number of pages needed for `total` items; never less than one.
pub fn page_count(total: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 1;
    }
    let pages = total.div_ceil(u64::from(page_size)).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Page to show after releasing one item from `page`, which held
/// `items_on_page` items before the release.
///
/// Emptying a trailing page steps back one page. When the backend reported
/// the new total, the result is also clamped to the last non-empty page.
pub fn page_after_release(
    page: u32,
    items_on_page: usize,
    total_after: Option<u64>,
    page_size: u32,
) -> u32 {
    let mut next = page.max(1);
    if items_on_page <= 1 && next > 1 {
        next -= 1;
    }
    if let Some(total) = total_after {
        next = next.min(page_count(total, page_size));
    }
    next
}

/// Table state driving `list_mine` requests.
///
/// Any change to the filter, page size or sort goes back to page 1.
#[derive(Debug, Clone, Default)]
pub struct CollectionBrowser {
    query: CollectionQuery,
}

impl CollectionBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(query: CollectionQuery) -> ApiResult<Self> {
        query.validate()?;
        Ok(Self { query })
    }

    pub fn query(&self) -> &CollectionQuery {
        &self.query
    }

    pub fn page(&self) -> u32 {
        self.query.page
    }

    pub fn set_page(&mut self, page: u32) -> ApiResult<()> {
        if page < 1 {
            return Err(ApiError::Validation("page must be at least 1".to_string()));
        }
        self.query.page = page;
        Ok(())
    }

    pub fn set_page_size(&mut self, page_size: u32) -> ApiResult<()> {
        if !PAGE_SIZES.contains(&page_size) {
            return Err(ApiError::Validation(format!(
                "page size {} not allowed (choose one of {:?})",
                page_size, PAGE_SIZES
            )));
        }
        self.query.page_size = page_size;
        self.query.page = 1;
        Ok(())
    }

    pub fn set_search(&mut self, search: &str) {
        self.query.search = normalize_search(search);
        self.query.page = 1;
    }

    pub fn set_sort(&mut self, sort_by: SortBy, sort_dir: SortDir) {
        self.query.sort_by = sort_by;
        self.query.sort_dir = sort_dir;
        self.query.page = 1;
    }

    /// Subscribe to the page the table currently shows.
    pub fn subscribe(&self, client: &CollectionClient) -> ApiResult<Subscription<CollectionPage>> {
        client.list_mine(&self.query)
    }

    /// Release `id` and move off the current page if it became empty.
    ///
    /// `items_on_page` is the number of rows shown before the release. The
    /// page only changes once the backend confirms.
    pub async fn release(
        &mut self,
        client: &CollectionClient,
        id: u32,
        items_on_page: usize,
    ) -> ApiResult<ReleaseReceipt> {
        let receipt = client.release(id).await?;
        let next = page_after_release(
            self.query.page,
            items_on_page,
            receipt.total,
            self.query.page_size,
        );
        if next != self.query.page {
            log::debug!("Page {} emptied, moving to page {}", self.query.page, next);
            self.query.page = next;
        }
        Ok(receipt)
    }
}

#[cfg(test)]
#[path = "browser_tests.rs"]
mod tests;
