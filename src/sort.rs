use std::cmp::Ordering;

use sea_orm::sea_query::Order;
use uuid::Uuid;

use crate::mapping::{MappingError, PropertyMapping};
use crate::shaping::PropertySchema;
use crate::source::QuerySource;

const DESCENDING_KEYWORD: &str = "desc";

/// Direction of a single ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    /// Descending only when `word` is `desc`, ignoring case. Anything else sorts ascending.
    #[must_use]
    pub fn parse(word: Option<&str>) -> Self {
        match word {
            Some(word) if word.eq_ignore_ascii_case(DESCENDING_KEYWORD) => Self::Descending,
            _ => Self::Ascending,
        }
    }

    #[must_use]
    pub fn reversed(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    /// Direction after applying a mapping's reverse flag.
    #[must_use]
    pub fn with_reverse(self, reverse: bool) -> Self {
        if reverse { self.reversed() } else { self }
    }

    #[must_use]
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

impl From<SortDirection> for Order {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Ascending => Order::Asc,
            SortDirection::Descending => Order::Desc,
        }
    }
}

/// One `property[ direction]` token of an order-by clause, before mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortToken<'a> {
    pub property: &'a str,
    pub direction: SortDirection,
}

/// Split an order-by clause such as `"genre desc, name"` into tokens.
///
/// A blank clause yields no tokens. Empty tokens between commas are kept with an
/// empty property name so validation can reject them.
#[must_use]
pub fn parse_order_by(order_by: &str) -> Vec<SortToken<'_>> {
    if order_by.trim().is_empty() {
        return Vec::new();
    }
    order_by
        .split(',')
        .map(|token| {
            let mut words = token.split_whitespace();
            let property = words.next().unwrap_or_default();
            SortToken {
                property,
                direction: SortDirection::parse(words.next()),
            }
        })
        .collect()
}

/// A resolved ordering key over a backing property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub property: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(property: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            property: property.into(),
            direction,
        }
    }

    pub fn compare<T: SortableEntity>(&self, a: &T, b: &T) -> Ordering {
        let left = a.sort_value(&self.property);
        let right = b.sort_value(&self.property);
        self.direction.apply(left.cmp(&right))
    }
}

/// Resolve an order-by clause through `mapping` into backing ordering keys.
///
/// Each token expands into one key per backing property, in mapping order. The
/// token's direction is applied to every backing property and then flipped for
/// those marked `reverse`.
///
/// # Errors
///
/// Returns [`MappingError::UnmappedProperty`] for a token without a mapping. Callers
/// validate the clause first, so this indicates a defect.
pub fn resolve_sort_keys(
    order_by: &str,
    mapping: &PropertyMapping,
) -> Result<Vec<SortKey>, MappingError> {
    let mut keys = Vec::new();
    for token in parse_order_by(order_by) {
        let values = mapping
            .get(token.property)
            .ok_or_else(|| MappingError::UnmappedProperty {
                property: token.property.to_string(),
            })?;
        keys.extend(values.iter().map(|value| {
            SortKey::new(
                value.destination_property.clone(),
                token.direction.with_reverse(value.reverse),
            )
        }));
    }
    Ok(keys)
}

/// Compare two items key by key: the first key decides, later keys break ties.
pub fn compare_by_keys<T: SortableEntity>(a: &T, b: &T, keys: &[SortKey]) -> Ordering {
    keys.iter()
        .fold(Ordering::Equal, |ordering, key| {
            ordering.then_with(|| key.compare(a, b))
        })
}

/// Multi-key comparator for use with a stable sort such as [`slice::sort_by`].
pub fn compose_comparator<T: SortableEntity>(
    keys: &[SortKey],
) -> impl Fn(&T, &T) -> Ordering + '_ {
    move |a, b| compare_by_keys(a, b, keys)
}

/// Resolve `order_by` and hand the resulting keys to `source`.
///
/// A blank clause leaves the source untouched.
///
/// # Errors
///
/// Returns a [`MappingError`] when a token has no mapping or the source cannot
/// order by a resolved backing property.
pub fn apply_sort<S: QuerySource>(
    source: S,
    order_by: &str,
    mapping: &PropertyMapping,
) -> Result<S, MappingError> {
    let keys = resolve_sort_keys(order_by, mapping)?;
    if keys.is_empty() {
        return Ok(source);
    }
    tracing::debug!(order_by = %order_by, keys = ?keys, "Applying sort keys");
    source.apply_sort(&keys)
}

/// Value a backing property contributes to an in-memory ordering.
///
/// Values of different kinds order by kind, `Null` first.
#[derive(Debug, Clone)]
pub enum SortValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
}

impl SortValue {
    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Integer(_) => 2,
            Self::Float(_) => 3,
            Self::Text(_) => 4,
            Self::Uuid(_) => 5,
        }
    }
}

impl Ord for SortValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Uuid(a), Self::Uuid(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for SortValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortValue {}

impl From<bool> for SortValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for SortValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<i64> for SortValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for SortValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for SortValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for SortValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SortValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for SortValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<Uuid> for SortValue {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl<T: Into<SortValue>> From<Option<T>> for SortValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Backing type that can be ordered in memory by its declared properties.
pub trait SortableEntity: PropertySchema {
    /// Value of a declared property; `None` for names the type does not declare.
    fn sort_value(&self, property: &str) -> Option<SortValue>;
}
