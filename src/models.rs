use serde::{Deserialize, Deserializer, Serialize};
use serde_with::{NoneAsEmptyString, serde_as};

/// Largest page a client may request; larger `pageSize` values are clamped.
pub const MAX_PAGE_SIZE: u64 = 20;
pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const DEFAULT_PAGE_NUMBER: u64 = 1;
pub const DEFAULT_ORDER_BY: &str = "name";

/// Resource-specific filter parameters, flattened into
/// [`ResourceQueryParameters`] and echoed into navigation links.
pub trait QueryFilters: Send + Sync {
    /// Query-string pairs for the filters that are set, in the order links should
    /// carry them.
    fn query_pairs(&self) -> Vec<(&'static str, String)>;
}

/// Filters for resources that have none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct NoFilters {}

impl QueryFilters for NoFilters {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

/// Query parameters for sorting, shaping, and paging a resource collection.
///
/// # Sorting
/// `orderBy` is a comma-separated list of exposed properties, each optionally
/// followed by `desc`:
/// ```text
/// ?orderBy=genre desc, name
/// ```
///
/// # Shaping
/// `fields` lists the properties to return. The identifier is always included:
/// ```text
/// ?fields=name,genre
/// ```
///
/// # Pagination
/// `pageNumber` starts at 1. `pageSize` is clamped to `1..=20`.
/// ```text
/// ?pageNumber=2&pageSize=5
/// ```
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceQueryParameters<F = NoFilters> {
    /// Comma-separated properties to return. Unset or empty returns all.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub fields: Option<String>,
    /// Order-by clause over exposed properties.
    #[serde(default = "default_order_by")]
    pub order_by: String,
    #[serde(
        default = "default_page_number",
        deserialize_with = "deserialize_page_number"
    )]
    pub page_number: u64,
    #[serde(default = "default_page_size", deserialize_with = "deserialize_page_size")]
    pub page_size: u64,
    #[serde(flatten)]
    pub filters: F,
}

fn default_order_by() -> String {
    DEFAULT_ORDER_BY.to_string()
}

fn default_page_number() -> u64 {
    DEFAULT_PAGE_NUMBER
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

fn deserialize_page_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(u64::deserialize(deserializer)?.max(1))
}

fn deserialize_page_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(clamp_page_size(u64::deserialize(deserializer)?))
}

fn clamp_page_size(page_size: u64) -> u64 {
    page_size.clamp(1, MAX_PAGE_SIZE)
}

impl<F> ResourceQueryParameters<F> {
    /// Parameters with defaults for everything but `filters`.
    pub fn new(filters: F) -> Self {
        Self {
            fields: None,
            order_by: default_order_by(),
            page_number: DEFAULT_PAGE_NUMBER,
            page_size: DEFAULT_PAGE_SIZE,
            filters,
        }
    }

    #[must_use]
    pub fn with_fields(mut self, fields: impl Into<String>) -> Self {
        let fields = fields.into();
        self.fields = (!fields.is_empty()).then_some(fields);
        self
    }

    #[must_use]
    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = order_by.into();
        self
    }

    #[must_use]
    pub fn with_page_number(mut self, page_number: u64) -> Self {
        self.page_number = page_number.max(1);
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = clamp_page_size(page_size);
        self
    }
}

impl<F: Default> Default for ResourceQueryParameters<F> {
    fn default() -> Self {
        Self::new(F::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::Uri;
    use serde::de::DeserializeOwned;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Filters {
        genre: Option<String>,
        search_query: Option<String>,
    }

    fn parse<F: DeserializeOwned>(query: &str) -> ResourceQueryParameters<F> {
        let uri: Uri = format!("http://localhost/api/authors?{query}").parse().unwrap();
        let Query(params) = Query::try_from_uri(&uri).unwrap();
        params
    }

    #[test]
    fn test_defaults() {
        let params: ResourceQueryParameters = parse("");
        assert_eq!(params, ResourceQueryParameters::default());
        assert_eq!(params.fields, None);
        assert_eq!(params.order_by, "name");
        assert_eq!(params.page_number, 1);
        assert_eq!(params.page_size, 10);
    }

    #[test]
    fn test_page_size_is_clamped() {
        let params: ResourceQueryParameters = parse("pageSize=100");
        assert_eq!(params.page_size, MAX_PAGE_SIZE);
        let params: ResourceQueryParameters = parse("pageSize=0");
        assert_eq!(params.page_size, 1);
        let params = ResourceQueryParameters::<NoFilters>::default().with_page_size(50);
        assert_eq!(params.page_size, 20);
    }

    #[test]
    fn test_page_number_is_at_least_one() {
        let params: ResourceQueryParameters = parse("pageNumber=0");
        assert_eq!(params.page_number, 1);
        let params = ResourceQueryParameters::<NoFilters>::default().with_page_number(0);
        assert_eq!(params.page_number, 1);
    }

    #[test]
    fn test_empty_fields_means_all() {
        let params: ResourceQueryParameters = parse("fields=");
        assert_eq!(params.fields, None);
        let params: ResourceQueryParameters = parse("fields=id,name");
        assert_eq!(params.fields.as_deref(), Some("id,name"));
        let params = ResourceQueryParameters::<NoFilters>::default().with_fields("");
        assert_eq!(params.fields, None);
    }

    #[test]
    fn test_empty_order_by_is_kept_blank() {
        let params: ResourceQueryParameters = parse("orderBy=");
        assert_eq!(params.order_by, "");
    }

    #[test]
    fn test_filters_are_flattened() {
        let params: ResourceQueryParameters<Filters> =
            parse("orderBy=genre%20desc&genre=Fantasy&searchQuery=king&pageNumber=2");
        assert_eq!(params.order_by, "genre desc");
        assert_eq!(params.page_number, 2);
        assert_eq!(
            params.filters,
            Filters {
                genre: Some("Fantasy".to_string()),
                search_query: Some("king".to_string()),
            }
        );
    }

    #[test]
    fn test_malformed_page_number_is_rejected() {
        let uri: Uri = "http://localhost/api/authors?pageNumber=two".parse().unwrap();
        assert!(Query::<ResourceQueryParameters>::try_from_uri(&uri).is_err());
    }
}
