//! # shapecrate
//!
//! Sorting, field shaping, paging, and navigation links for Axum + Sea-ORM
//! collection endpoints.
//!
//! A client asks for `GET /api/authors?orderBy=genre desc, name&fields=name&pageSize=5`.
//! The server registers once, at startup, how the exposed `AuthorDto` properties map
//! onto the backing entity's columns; [`QueryEngine`] then validates the request,
//! pushes the resolved ordering into the query, slices out the page, and returns
//! only the requested fields with `X-Pagination` metadata and links.
//!
//! ```rust,ignore
//! let registry = PropertyMappingRegistry::builder()
//!     .register::<AuthorDto, author::Model>(
//!         PropertyMapping::new()
//!             .map("id", [PropertyMappingValue::new("id")])
//!             .map("name", [
//!                 PropertyMappingValue::new("last_name"),
//!                 PropertyMappingValue::new("first_name"),
//!             ])
//!             .map("age", [PropertyMappingValue::reversed("date_of_birth")])
//!             .with_default_order_by("name"),
//!     )
//!     .build()?;
//! let engine = QueryEngine::new(registry);
//! ```

pub mod errors;
pub mod links;
pub mod mapping;
pub mod models;
pub mod pagination;
pub mod routes;
pub mod shaping;
pub mod sort;
pub mod source;
pub mod traits;

pub use errors::ApiError;
pub use links::{Link, LinkAction, ResourceLinkBuilder, ResourceUriType};
pub use mapping::{PropertyMapping, PropertyMappingRegistry, PropertyMappingValue};
pub use models::{QueryFilters, ResourceQueryParameters};
pub use pagination::PagedList;
pub use routes::{CollectionResponse, HATEOAS_MEDIA_TYPE, QueryEngine, ResponseMode};
pub use shaping::{DataShape, PropertySchema, ShapedEntity};
pub use sort::{SortValue, SortableEntity};
pub use source::{EntitySource, InMemorySource, QuerySource};
pub use traits::ShapedResource;
