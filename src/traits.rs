use crate::links::LinkAction;
use crate::models::QueryFilters;
use crate::shaping::{DataShape, PropertySchema};

/// A client-facing resource served through [`crate::routes::QueryEngine`].
///
/// The resource is built from its backing type after paging, so sorting and
/// counting happen on `Backing` and only the returned page is converted.
pub trait ShapedResource: DataShape + From<Self::Backing> + Send + Sync + 'static {
    type Backing: PropertySchema + Send + 'static;
    type Filters: QueryFilters;

    const RESOURCE_NAME_SINGULAR: &'static str;
    const RESOURCE_NAME_PLURAL: &'static str;

    /// Actions advertised on every item, after its `self` link.
    #[must_use]
    fn item_actions() -> Vec<LinkAction> {
        Vec::new()
    }
}
