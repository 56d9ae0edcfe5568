//! # Navigation Links
//!
//! Builds the `self`, `nextPage`, and `previousPage` links of a collection page and
//! the per-item links of a shaped resource. Query strings echo the request's
//! parameters in a fixed order (`fields`, `orderBy`, filters, `pageNumber`,
//! `pageSize`), so identical requests always produce identical links.

use std::fmt;

use axum::http::Method;
use serde::{Deserialize, Serialize};
use url::{Url, form_urlencoded};
use utoipa::ToSchema;

use crate::models::{QueryFilters, ResourceQueryParameters};

pub const REL_SELF: &str = "self";
pub const REL_NEXT_PAGE: &str = "nextPage";
pub const REL_PREVIOUS_PAGE: &str = "previousPage";

/// A hypermedia link, serialized as `{ "href", "rel", "method" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Link {
    pub href: String,
    pub rel: String,
    pub method: String,
}

impl Link {
    pub fn new(href: impl Into<String>, rel: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            rel: rel.into(),
            method: method.into(),
        }
    }
}

/// Which page of a collection a URI should point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceUriType {
    PreviousPage,
    NextPage,
    Current,
}

/// An action a resource advertises on each of its items, such as deleting it or
/// listing a child collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkAction {
    rel: String,
    method: Method,
    path: Option<String>,
}

impl LinkAction {
    /// Action on the item URI itself.
    pub fn new(rel: impl Into<String>, method: Method) -> Self {
        Self {
            rel: rel.into(),
            method,
            path: None,
        }
    }

    /// Point the action at a path below the item URI, e.g. `books`.
    #[must_use]
    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn rel(&self) -> &str {
        &self.rel
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    InvalidUrl {
        url: String,
        reason: url::ParseError,
    },
    /// The URL has no path to append item segments to (e.g. `mailto:`).
    NotHierarchical { url: String },
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl { url, reason } => write!(f, "Invalid collection URL '{url}': {reason}"),
            Self::NotHierarchical { url } => {
                write!(f, "Collection URL '{url}' cannot have path segments")
            }
        }
    }
}

impl std::error::Error for LinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidUrl { reason, .. } => Some(reason),
            Self::NotHierarchical { .. } => None,
        }
    }
}

/// Link builder for one resource collection, e.g. `http://localhost:3000/api/authors`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLinkBuilder {
    collection: Url,
}

impl ResourceLinkBuilder {
    /// # Errors
    ///
    /// Returns a [`LinkError`] if `collection_url` is not an absolute hierarchical URL.
    pub fn new(collection_url: &str) -> Result<Self, LinkError> {
        let mut collection = Url::parse(collection_url).map_err(|reason| LinkError::InvalidUrl {
            url: collection_url.to_string(),
            reason,
        })?;
        if collection.cannot_be_a_base() {
            return Err(LinkError::NotHierarchical {
                url: collection_url.to_string(),
            });
        }
        collection.set_query(None);
        collection.set_fragment(None);
        if let Ok(mut segments) = collection.path_segments_mut() {
            segments.pop_if_empty();
        }
        Ok(Self { collection })
    }

    #[must_use]
    pub fn collection_url(&self) -> &str {
        self.collection.as_str()
    }

    /// URI of a collection page, echoing `params` with only `pageNumber` adjusted.
    #[must_use]
    pub fn resource_uri<F: QueryFilters>(
        &self,
        params: &ResourceQueryParameters<F>,
        uri_type: ResourceUriType,
    ) -> String {
        self.page_uri(params, neighbour_page(params.page_number, uri_type))
    }

    /// URI of page `page_number`, echoing every other value in `params`.
    #[must_use]
    pub fn page_uri<F: QueryFilters>(
        &self,
        params: &ResourceQueryParameters<F>,
        page_number: u64,
    ) -> String {
        let mut pairs: Vec<(&str, String)> = Vec::new();
        if let Some(fields) = params.fields.as_deref().filter(|f| !f.is_empty()) {
            pairs.push(("fields", fields.to_string()));
        }
        if !params.order_by.is_empty() {
            pairs.push(("orderBy", params.order_by.clone()));
        }
        pairs.extend(params.filters.query_pairs());
        pairs.push(("pageNumber", page_number.to_string()));
        pairs.push(("pageSize", params.page_size.to_string()));

        with_query(self.collection.clone(), &pairs).into()
    }

    /// Links for a collection page: `self`, then `nextPage` and `previousPage` when
    /// those pages exist.
    #[must_use]
    pub fn links_for_collection<F: QueryFilters>(
        &self,
        params: &ResourceQueryParameters<F>,
        has_next: bool,
        has_previous: bool,
    ) -> Vec<Link> {
        self.links_for_page(params, params.page_number, has_next, has_previous)
    }

    /// Like [`links_for_collection`](Self::links_for_collection), with `nextPage` and
    /// `previousPage` counted from `current_page` instead of the requested page.
    /// `self` still echoes the request.
    #[must_use]
    pub fn links_for_page<F: QueryFilters>(
        &self,
        params: &ResourceQueryParameters<F>,
        current_page: u64,
        has_next: bool,
        has_previous: bool,
    ) -> Vec<Link> {
        let get = Method::GET.as_str();
        let mut links = vec![Link::new(
            self.resource_uri(params, ResourceUriType::Current),
            REL_SELF,
            get,
        )];
        if has_next {
            links.push(Link::new(
                self.page_uri(params, neighbour_page(current_page, ResourceUriType::NextPage)),
                REL_NEXT_PAGE,
                get,
            ));
        }
        if has_previous {
            links.push(Link::new(
                self.page_uri(
                    params,
                    neighbour_page(current_page, ResourceUriType::PreviousPage),
                ),
                REL_PREVIOUS_PAGE,
                get,
            ));
        }
        links
    }

    /// URI of a single item.
    #[must_use]
    pub fn item_uri(&self, id: &str) -> Url {
        let mut url = self.collection.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(id);
        }
        url
    }

    /// Links for a single item: `self` (carrying `fields` only when the request was
    /// shaped), then one link per action.
    #[must_use]
    pub fn links_for_item(
        &self,
        id: &str,
        fields: Option<&str>,
        actions: &[LinkAction],
    ) -> Vec<Link> {
        let item = self.item_uri(id);
        let self_href = match fields.map(str::trim).filter(|f| !f.is_empty()) {
            Some(fields) => with_query(item.clone(), &[("fields", fields)]),
            None => item.clone(),
        };

        let mut links = Vec::with_capacity(actions.len() + 1);
        links.push(Link::new(self_href, REL_SELF, Method::GET.as_str()));
        links.extend(actions.iter().map(|action| {
            let mut href = item.clone();
            if let (Some(path), Ok(mut segments)) = (&action.path, href.path_segments_mut()) {
                segments.extend(path.split('/').filter(|segment| !segment.is_empty()));
            }
            Link::new(href, action.rel.clone(), action.method.as_str())
        }));
        links
    }
}

fn neighbour_page(page_number: u64, uri_type: ResourceUriType) -> u64 {
    match uri_type {
        ResourceUriType::PreviousPage => page_number.saturating_sub(1).max(1),
        ResourceUriType::NextPage => page_number.saturating_add(1),
        ResourceUriType::Current => page_number,
    }
}

fn with_query<K, V>(mut url: Url, pairs: &[(K, V)]) -> Url
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if !pairs.is_empty() {
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        url.set_query(Some(&query));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoFilters;

    struct GenreFilters {
        genre: Option<String>,
        search_query: Option<String>,
    }

    impl QueryFilters for GenreFilters {
        fn query_pairs(&self) -> Vec<(&'static str, String)> {
            let mut pairs = Vec::new();
            if let Some(search_query) = &self.search_query {
                pairs.push(("searchQuery", search_query.clone()));
            }
            if let Some(genre) = &self.genre {
                pairs.push(("genre", genre.clone()));
            }
            pairs
        }
    }

    fn builder() -> ResourceLinkBuilder {
        ResourceLinkBuilder::new("http://localhost:3000/api/authors/").unwrap()
    }

    #[test]
    fn test_rejects_invalid_collection_url() {
        assert!(matches!(
            ResourceLinkBuilder::new("not a url"),
            Err(LinkError::InvalidUrl { .. })
        ));
        assert!(matches!(
            ResourceLinkBuilder::new("mailto:someone@example.com"),
            Err(LinkError::NotHierarchical { .. })
        ));
    }

    #[test]
    fn test_collection_url_is_normalised() {
        let builder = ResourceLinkBuilder::new("http://localhost:3000/api/authors/?x=1#top").unwrap();
        assert_eq!(builder.collection_url(), "http://localhost:3000/api/authors");
    }

    #[test]
    fn test_resource_uri_echoes_parameters_in_fixed_order() {
        let params = ResourceQueryParameters::new(GenreFilters {
            genre: Some("Fantasy".to_string()),
            search_query: Some("king".to_string()),
        })
        .with_fields("id,name")
        .with_order_by("genre desc")
        .with_page_number(2)
        .with_page_size(5);

        assert_eq!(
            builder().resource_uri(&params, ResourceUriType::Current),
            "http://localhost:3000/api/authors?fields=id%2Cname&orderBy=genre+desc&searchQuery=king&genre=Fantasy&pageNumber=2&pageSize=5"
        );
        assert!(builder()
            .resource_uri(&params, ResourceUriType::NextPage)
            .ends_with("pageNumber=3&pageSize=5"));
        assert!(builder()
            .resource_uri(&params, ResourceUriType::PreviousPage)
            .ends_with("pageNumber=1&pageSize=5"));
    }

    #[test]
    fn test_resource_uri_omits_unset_values() {
        let params = ResourceQueryParameters::new(NoFilters::default());
        assert_eq!(
            builder().resource_uri(&params, ResourceUriType::Current),
            "http://localhost:3000/api/authors?orderBy=name&pageNumber=1&pageSize=10"
        );
    }

    #[test]
    fn test_collection_links_are_conditional() {
        let params = ResourceQueryParameters::new(NoFilters::default()).with_page_number(2);

        let links = builder().links_for_collection(&params, true, true);
        let rels: Vec<&str> = links.iter().map(|l| l.rel.as_str()).collect();
        assert_eq!(rels, [REL_SELF, REL_NEXT_PAGE, REL_PREVIOUS_PAGE]);
        assert!(links.iter().all(|l| l.method == "GET"));

        let links = builder().links_for_collection(&params, false, false);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].rel, REL_SELF);
    }

    #[test]
    fn test_page_links_count_from_reported_page() {
        let params = ResourceQueryParameters::new(NoFilters::default()).with_page_number(9);

        let links = builder().links_for_page(&params, 3, false, true);
        assert_eq!(links.len(), 2);
        assert!(links[0].href.ends_with("pageNumber=9&pageSize=10"));
        assert_eq!(links[1].rel, REL_PREVIOUS_PAGE);
        assert!(links[1].href.ends_with("pageNumber=2&pageSize=10"));
    }

    #[test]
    fn test_collection_links_are_deterministic() {
        let params = ResourceQueryParameters::new(GenreFilters {
            genre: Some("Horror".to_string()),
            search_query: None,
        })
        .with_page_number(3);
        let first = builder().links_for_collection(&params, true, true);
        let second = builder().links_for_collection(&params, true, true);
        assert_eq!(first, second);
    }

    #[test]
    fn test_item_self_link_unadorned_without_fields() {
        let links = builder().links_for_item("id-1", None, &[]);
        assert_eq!(links, vec![Link::new("http://localhost:3000/api/authors/id-1", "self", "GET")]);

        let links = builder().links_for_item("id-1", Some(""), &[]);
        assert_eq!(links[0].href, "http://localhost:3000/api/authors/id-1");
    }

    #[test]
    fn test_item_self_link_carries_fields() {
        let links = builder().links_for_item("id-1", Some("name,genre"), &[]);
        assert_eq!(
            links[0].href,
            "http://localhost:3000/api/authors/id-1?fields=name%2Cgenre"
        );
    }

    #[test]
    fn test_item_actions_follow_self() {
        let actions = [
            LinkAction::new("delete_author", Method::DELETE),
            LinkAction::new("create_book_for_author", Method::POST).at("books"),
            LinkAction::new("books", Method::GET).at("/books/"),
        ];
        let links = builder().links_for_item("id-1", Some("name"), &actions);
        assert_eq!(
            links,
            vec![
                Link::new("http://localhost:3000/api/authors/id-1?fields=name", "self", "GET"),
                Link::new("http://localhost:3000/api/authors/id-1", "delete_author", "DELETE"),
                Link::new(
                    "http://localhost:3000/api/authors/id-1/books",
                    "create_book_for_author",
                    "POST"
                ),
                Link::new("http://localhost:3000/api/authors/id-1/books", "books", "GET"),
            ]
        );
    }

    #[test]
    fn test_item_id_is_percent_encoded() {
        let url = builder().item_uri("a b/c");
        assert_eq!(url.as_str(), "http://localhost:3000/api/authors/a%20b%2Fc");
    }
}
