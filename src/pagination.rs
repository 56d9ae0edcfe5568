use axum::http::header::{HeaderMap, HeaderName, HeaderValue};
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::source::QuerySource;

pub const PAGINATION_HEADER: &str = "x-pagination";

/// One page of a collection, with the counts needed to navigate the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedList<T> {
    items: Vec<T>,
    total_count: u64,
    page_size: u64,
    current_page: u64,
    total_pages: u64,
}

impl<T> PagedList<T> {
    /// Wrap an already sliced page. `page_number` and `page_size` are raised to 1,
    /// and `current_page` never exceeds `max(total_pages, 1)`.
    #[must_use]
    pub fn new(items: Vec<T>, total_count: u64, page_number: u64, page_size: u64) -> Self {
        let page_size = page_size.max(1);
        let total_pages = total_count.div_ceil(page_size);
        Self {
            items,
            total_count,
            page_size,
            current_page: page_number.clamp(1, total_pages.max(1)),
            total_pages,
        }
    }

    /// Count `source`, then slice out page `page_number` (1-based).
    ///
    /// A page past the end has no items; `current_page` is then the last page.
    ///
    /// # Errors
    ///
    /// Propagates errors from counting or slicing the source.
    pub async fn create<S>(source: S, page_number: u64, page_size: u64) -> Result<Self, DbErr>
    where
        S: QuerySource<Item = T>,
    {
        let page_number = page_number.max(1);
        let page_size = page_size.max(1);
        let total_count = source.count().await?;
        let offset = (page_number - 1).saturating_mul(page_size);

        let items = if offset < total_count {
            source.slice(offset, page_size).await?
        } else {
            Vec::new()
        };

        tracing::debug!(
            total_count,
            page_number,
            page_size,
            returned = items.len(),
            "Created paged list"
        );
        Ok(Self::new(items, total_count, page_number, page_size))
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    #[must_use]
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    #[must_use]
    pub fn current_page(&self) -> u64 {
        self.current_page
    }

    #[must_use]
    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    /// Convert every item, keeping the page counts.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedList<U> {
        PagedList {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page_size: self.page_size,
            current_page: self.current_page,
            total_pages: self.total_pages,
        }
    }

    /// Convert every item, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `f`.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<PagedList<U>, E> {
        Ok(PagedList {
            items: self.items.into_iter().map(f).collect::<Result<_, _>>()?,
            total_count: self.total_count,
            page_size: self.page_size,
            current_page: self.current_page,
            total_pages: self.total_pages,
        })
    }

    #[must_use]
    pub fn metadata(&self) -> PaginationMetadata {
        PaginationMetadata {
            total_count: self.total_count,
            page_size: self.page_size,
            current_page: self.current_page,
            total_pages: self.total_pages,
        }
    }

    #[must_use]
    pub fn navigation_metadata(
        &self,
        previous_page_link: Option<String>,
        next_page_link: Option<String>,
    ) -> PagedNavigationMetadata {
        PagedNavigationMetadata {
            previous_page_link,
            next_page_link,
            total_count: self.total_count,
            page_size: self.page_size,
            current_page: self.current_page,
            total_pages: self.total_pages,
        }
    }
}

/// Pagination metadata sent with hypermedia responses, whose body already
/// carries navigation links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMetadata {
    pub total_count: u64,
    pub page_size: u64,
    pub current_page: u64,
    pub total_pages: u64,
}

/// Pagination metadata sent with plain responses, including the neighbouring
/// page URIs when those pages exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PagedNavigationMetadata {
    pub previous_page_link: Option<String>,
    pub next_page_link: Option<String>,
    pub total_count: u64,
    pub page_size: u64,
    pub current_page: u64,
    pub total_pages: u64,
}

/// Build the `X-Pagination` header carrying `metadata` as JSON.
///
/// Metadata that cannot be encoded is logged and the header is left out.
#[must_use]
pub fn pagination_header<M: Serialize>(metadata: &M) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let value = serde_json::to_string(metadata)
        .map_err(|err| err.to_string())
        .and_then(|json| HeaderValue::from_str(&json).map_err(|err| err.to_string()));
    match value {
        Ok(value) => {
            headers.insert(HeaderName::from_static(PAGINATION_HEADER), value);
        }
        Err(err) => tracing::error!(error = %err, "Failed to encode pagination header"),
    }
    headers
}
