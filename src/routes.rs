use std::sync::Arc;

use axum::{
    Json,
    http::header::ACCEPT,
    response::{IntoResponse, Response},
};
use hyper::HeaderMap;
use serde::Serialize;

use crate::errors::ApiError;
use crate::links::{Link, ResourceLinkBuilder};
use crate::mapping::PropertyMappingRegistry;
use crate::models::ResourceQueryParameters;
use crate::pagination::{
    PagedList, PagedNavigationMetadata, PaginationMetadata, pagination_header,
};
use crate::shaping::{ShapedEntity, shape_data, type_has_properties};
use crate::sort::{apply_sort, parse_order_by};
use crate::source::QuerySource;
use crate::traits::ShapedResource;

/// Media type a client sends in `Accept` to receive links inside the body.
pub const HATEOAS_MEDIA_TYPE: &str = "application/vnd.shapecrate.hateoas+json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// Plain array body; navigation links go in the `X-Pagination` header.
    #[default]
    Plain,
    /// `{ value, links }` body with links on every item.
    Hypermedia,
}

impl ResponseMode {
    /// Hypermedia when any `Accept` entry names [`HATEOAS_MEDIA_TYPE`].
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let hypermedia = headers
            .get_all(ACCEPT)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .filter_map(|media_range| media_range.split(';').next())
            .any(|media_type| media_type.trim().eq_ignore_ascii_case(HATEOAS_MEDIA_TYPE));
        if hypermedia {
            Self::Hypermedia
        } else {
            Self::Plain
        }
    }
}

/// Runs collection and item requests against a shared mapping registry.
///
/// ```rust,ignore
/// async fn get_authors(
///     State(state): State<AppState>,
///     headers: HeaderMap,
///     Query(params): Query<ResourceQueryParameters<AuthorFilters>>,
/// ) -> Result<CollectionResponse, ApiError> {
///     let source = EntitySource::<author::Entity>::new(&state.db);
///     state
///         .engine
///         .collection::<AuthorDto, _>(&state.links, &params, source, ResponseMode::from_headers(&headers))
///         .await
/// }
/// ```
#[derive(Debug, Clone)]
pub struct QueryEngine {
    registry: Arc<PropertyMappingRegistry>,
}

impl QueryEngine {
    #[must_use]
    pub fn new(registry: PropertyMappingRegistry) -> Self {
        Self::from_shared(Arc::new(registry))
    }

    #[must_use]
    pub fn from_shared(registry: Arc<PropertyMappingRegistry>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &PropertyMappingRegistry {
        &self.registry
    }

    /// Reject an `orderBy` or `fields` clause naming properties `R` does not expose.
    ///
    /// # Errors
    ///
    /// `400 Bad Request` listing the offending names, or `500` when `R` has no
    /// registered mapping.
    pub fn validate<R: ShapedResource>(
        &self,
        params: &ResourceQueryParameters<R::Filters>,
    ) -> Result<(), ApiError> {
        if !self
            .registry
            .valid_mapping_exists_for::<R, R::Backing>(&params.order_by)?
        {
            let mapping = self.registry.get_property_mapping::<R, R::Backing>()?;
            let unknown: Vec<String> = parse_order_by(&params.order_by)
                .into_iter()
                .filter(|token| !mapping.contains(token.property))
                .map(|token| token.property.to_string())
                .collect();
            tracing::warn!(
                resource = R::RESOURCE_NAME_PLURAL,
                order_by = %params.order_by,
                "Rejected orderBy clause"
            );
            return Err(ApiError::bad_request_with_details(
                "orderBy names properties that cannot be sorted on",
                unknown,
            ));
        }
        validate_fields::<R>(params.fields.as_deref())
    }

    /// Validate, sort, page, and shape a collection request.
    ///
    /// A blank `orderBy` falls back to the mapping's default clause.
    ///
    /// # Errors
    ///
    /// See [`QueryEngine::validate`]; data source failures surface as `500`.
    pub async fn collection<R, S>(
        &self,
        links: &ResourceLinkBuilder,
        params: &ResourceQueryParameters<R::Filters>,
        source: S,
        mode: ResponseMode,
    ) -> Result<CollectionResponse, ApiError>
    where
        R: ShapedResource,
        S: QuerySource<Item = R::Backing>,
    {
        self.validate::<R>(params)?;

        let mapping = self.registry.get_property_mapping::<R, R::Backing>()?;
        let order_by = if params.order_by.trim().is_empty() {
            mapping.default_order_by().unwrap_or_default()
        } else {
            params.order_by.as_str()
        };
        let source = apply_sort(source, order_by, mapping)?;

        let page = PagedList::create(source, params.page_number, params.page_size)
            .await?
            .map(R::from);
        let fields = params.fields.as_deref();
        let shaped = shape_data(page.items(), fields)?;

        tracing::debug!(
            resource = R::RESOURCE_NAME_PLURAL,
            order_by,
            mode = ?mode,
            items = shaped.len(),
            "Composed collection response"
        );

        let response = match mode {
            ResponseMode::Plain => CollectionResponse {
                metadata: CollectionMetadata::Navigation(page.navigation_metadata(
                    page.has_previous()
                        .then(|| links.page_uri(params, page.current_page() - 1)),
                    page.has_next()
                        .then(|| links.page_uri(params, page.current_page() + 1)),
                )),
                body: CollectionBody::Plain(shaped),
            },
            ResponseMode::Hypermedia => {
                let value = shaped
                    .into_iter()
                    .map(|entity| with_item_links::<R>(links, entity, fields))
                    .collect::<Result<Vec<_>, _>>()?;
                CollectionResponse {
                    metadata: CollectionMetadata::Page(page.metadata()),
                    body: CollectionBody::Linked {
                        value,
                        links: links.links_for_page(
                            params,
                            page.current_page(),
                            page.has_next(),
                            page.has_previous(),
                        ),
                    },
                }
            }
        };
        Ok(response)
    }

    /// Shape a single resource and attach its `self` link and item actions.
    ///
    /// Call [`validate_fields`] before loading the item so a bad `fields` clause is
    /// a `400` even when the item does not exist.
    ///
    /// ```rust,ignore
    /// validate_fields::<AuthorDto>(query.fields.as_deref())?;
    /// let author = author::Entity::find_by_id(id)
    ///     .one(&state.db)
    ///     .await?
    ///     .ok_or_else(|| ApiError::not_found("Author", Some(id.to_string())))?;
    /// let entity = state.engine.item(&state.links, &AuthorDto::from(author), query.fields.as_deref())?;
    /// ```
    ///
    /// # Errors
    ///
    /// `400 Bad Request` for unknown `fields`.
    #[allow(clippy::unused_self)]
    pub fn item<R: ShapedResource>(
        &self,
        links: &ResourceLinkBuilder,
        item: &R,
        fields: Option<&str>,
    ) -> Result<ShapedEntity, ApiError> {
        validate_fields::<R>(fields)?;
        let entity = item.shape(fields)?;
        with_item_links::<R>(links, entity, fields)
    }
}

/// # Errors
///
/// `400 Bad Request` listing the names in `fields` that `R` does not declare.
pub fn validate_fields<R: ShapedResource>(fields: Option<&str>) -> Result<(), ApiError> {
    if type_has_properties::<R>(fields) {
        return Ok(());
    }
    let unknown: Vec<String> = fields
        .unwrap_or_default()
        .split(',')
        .filter(|field| R::find_property(field).is_none())
        .map(|field| field.trim().to_string())
        .collect();
    tracing::warn!(
        resource = R::RESOURCE_NAME_PLURAL,
        fields = ?fields,
        "Rejected fields clause"
    );
    Err(ApiError::bad_request_with_details(
        "Requested fields do not exist on this resource",
        unknown,
    ))
}

fn with_item_links<R: ShapedResource>(
    links: &ResourceLinkBuilder,
    entity: ShapedEntity,
    fields: Option<&str>,
) -> Result<ShapedEntity, ApiError> {
    let id = entity.id_segment().ok_or_else(|| {
        ApiError::internal(
            "An internal error occurred",
            Some(format!(
                "{} has no usable '{}' value for links",
                R::RESOURCE_NAME_SINGULAR,
                R::ID_PROPERTY
            )),
        )
    })?;
    let item_links = links.links_for_item(&id, fields, &R::item_actions());
    Ok(entity.with_links(item_links))
}

/// Response body of a collection request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CollectionBody {
    Plain(Vec<ShapedEntity>),
    Linked {
        value: Vec<ShapedEntity>,
        links: Vec<Link>,
    },
}

/// Contents of the `X-Pagination` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CollectionMetadata {
    Navigation(PagedNavigationMetadata),
    Page(PaginationMetadata),
}

/// `200 OK` with an `X-Pagination` header and a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionResponse {
    pub metadata: CollectionMetadata,
    pub body: CollectionBody,
}

impl IntoResponse for CollectionResponse {
    fn into_response(self) -> Response {
        (pagination_header(&self.metadata), Json(self.body)).into_response()
    }
}
