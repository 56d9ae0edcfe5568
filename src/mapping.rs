//! # Property Mapping
//!
//! Client-facing resource types rarely expose the backing store's schema as-is. A
//! [`PropertyMapping`] table translates each exposed property name into one or more
//! backing properties, each of which may sort in the opposite direction (an exposed
//! `age` sorts ascending when the backing `date_of_birth` sorts descending).
//!
//! Tables are registered once per (resource type, backing type) pair in a
//! [`PropertyMappingRegistry`], which is validated when it is built and read-only
//! afterwards.
//!
//! ```rust,ignore
//! let registry = PropertyMappingRegistry::builder()
//!     .register::<AuthorDto, author::Model>(
//!         PropertyMapping::new()
//!             .map("id", [PropertyMappingValue::new("id")])
//!             .map("genre", [PropertyMappingValue::new("genre")])
//!             .map("age", [PropertyMappingValue::reversed("date_of_birth")])
//!             .map("name", [
//!                 PropertyMappingValue::new("last_name"),
//!                 PropertyMappingValue::new("first_name"),
//!             ])
//!             .with_default_order_by("name"),
//!     )
//!     .build()?;
//! ```

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::fmt;

use crate::shaping::PropertySchema;
use crate::sort::parse_order_by;

/// A single backing property an exposed property resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMappingValue {
    /// Backing property name, normalised to the backing type's declared spelling on registration.
    pub destination_property: String,
    /// When set, this property sorts opposite to the direction the client asked for.
    pub reverse: bool,
}

impl PropertyMappingValue {
    pub fn new(destination_property: impl Into<String>) -> Self {
        Self {
            destination_property: destination_property.into(),
            reverse: false,
        }
    }

    pub fn reversed(destination_property: impl Into<String>) -> Self {
        Self {
            destination_property: destination_property.into(),
            reverse: true,
        }
    }
}

/// Mapping table for one (resource type, backing type) pair.
///
/// Exposed names are matched case-insensitively and with surrounding whitespace
/// ignored.
#[derive(Debug, Clone, Default)]
pub struct PropertyMapping {
    entries: Vec<(String, Vec<PropertyMappingValue>)>,
    default_order_by: Option<String>,
}

impl PropertyMapping {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map an exposed property to its backing properties, in sort priority order.
    #[must_use]
    pub fn map<I>(mut self, exposed_property: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = PropertyMappingValue>,
    {
        self.entries
            .push((exposed_property.into(), values.into_iter().collect()));
        self
    }

    /// Order-by clause used when the client sends a blank one.
    #[must_use]
    pub fn with_default_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.default_order_by = Some(order_by.into());
        self
    }

    /// Backing properties for an exposed property, if one is mapped.
    #[must_use]
    pub fn get(&self, exposed_property: &str) -> Option<&[PropertyMappingValue]> {
        let exposed_property = exposed_property.trim();
        self.entries
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(exposed_property))
            .map(|(_, values)| values.as_slice())
    }

    #[must_use]
    pub fn contains(&self, exposed_property: &str) -> bool {
        self.get(exposed_property).is_some()
    }

    #[must_use]
    pub fn default_order_by(&self) -> Option<&str> {
        self.default_order_by.as_deref()
    }

    /// Exposed property names in registration order.
    pub fn exposed_properties(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Whether every property named in `order_by` has a mapping.
    ///
    /// A blank clause is valid. An empty token (`"name,"`) is not.
    #[must_use]
    pub fn is_valid_order_by(&self, order_by: &str) -> bool {
        parse_order_by(order_by)
            .iter()
            .all(|token| self.contains(token.property))
    }
}

/// Configuration defects in mapping registration or resolution.
///
/// These indicate a registration bug rather than bad client input, and surface as
/// `500 Internal Server Error` when they reach a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// No table was registered for the requested pair.
    MissingMapping {
        resource: &'static str,
        backing: &'static str,
    },
    /// The same pair was registered twice.
    DuplicateMapping {
        resource: &'static str,
        backing: &'static str,
    },
    /// An exposed property was mapped to no backing properties, or mapped twice.
    InvalidEntry { property: String, reason: String },
    /// A property name is not declared on the type it was expected on.
    UnknownProperty {
        property: String,
        owner: &'static str,
    },
    /// A sort token reached resolution without a mapping.
    UnmappedProperty { property: String },
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingMapping { resource, backing } => {
                write!(f, "No property mapping registered for {resource} -> {backing}")
            }
            Self::DuplicateMapping { resource, backing } => {
                write!(
                    f,
                    "Property mapping for {resource} -> {backing} registered more than once"
                )
            }
            Self::InvalidEntry { property, reason } => {
                write!(f, "Invalid mapping entry '{property}': {reason}")
            }
            Self::UnknownProperty { property, owner } => {
                write!(f, "Property '{property}' is not declared on {owner}")
            }
            Self::UnmappedProperty { property } => {
                write!(f, "No mapping found for sort property '{property}'")
            }
        }
    }
}

impl std::error::Error for MappingError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct MappingKey {
    resource: TypeId,
    backing: TypeId,
}

impl MappingKey {
    fn of<D: 'static, B: 'static>() -> Self {
        Self {
            resource: TypeId::of::<D>(),
            backing: TypeId::of::<B>(),
        }
    }
}

/// Immutable set of mapping tables, built once at startup and shared by reference.
#[derive(Debug, Default)]
pub struct PropertyMappingRegistry {
    mappings: HashMap<MappingKey, PropertyMapping>,
}

impl PropertyMappingRegistry {
    #[must_use]
    pub fn builder() -> PropertyMappingRegistryBuilder {
        PropertyMappingRegistryBuilder::default()
    }

    /// Mapping table for the `D` -> `B` pair.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::MissingMapping`] when no table was registered for the pair.
    pub fn get_property_mapping<D: 'static, B: 'static>(
        &self,
    ) -> Result<&PropertyMapping, MappingError> {
        self.mappings
            .get(&MappingKey::of::<D, B>())
            .ok_or(MappingError::MissingMapping {
                resource: type_name::<D>(),
                backing: type_name::<B>(),
            })
    }

    /// Whether every property in `order_by` is mapped for the `D` -> `B` pair.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::MissingMapping`] when no table was registered for the pair.
    pub fn valid_mapping_exists_for<D: 'static, B: 'static>(
        &self,
        order_by: &str,
    ) -> Result<bool, MappingError> {
        Ok(self
            .get_property_mapping::<D, B>()?
            .is_valid_order_by(order_by))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// Collects mapping tables and validates them against the declared properties of
/// both sides of each pair.
#[derive(Debug, Default)]
pub struct PropertyMappingRegistryBuilder {
    mappings: HashMap<MappingKey, PropertyMapping>,
    errors: Vec<MappingError>,
}

impl PropertyMappingRegistryBuilder {
    /// Register the table for resource type `D` backed by `B`.
    ///
    /// Backing property names are rewritten to `B`'s declared spelling so sources can
    /// look them up verbatim.
    #[must_use]
    pub fn register<D, B>(mut self, mut mapping: PropertyMapping) -> Self
    where
        D: PropertySchema + 'static,
        B: PropertySchema + 'static,
    {
        let key = MappingKey::of::<D, B>();
        if self.mappings.contains_key(&key) {
            self.errors.push(MappingError::DuplicateMapping {
                resource: type_name::<D>(),
                backing: type_name::<B>(),
            });
            return self;
        }

        for (exposed, values) in &mut mapping.entries {
            if D::find_property(exposed).is_none() {
                self.errors.push(MappingError::UnknownProperty {
                    property: exposed.clone(),
                    owner: type_name::<D>(),
                });
            }
            if values.is_empty() {
                self.errors.push(MappingError::InvalidEntry {
                    property: exposed.clone(),
                    reason: "no backing properties".to_string(),
                });
            }
            for value in values.iter_mut() {
                match B::find_property(&value.destination_property) {
                    Some(declared) => value.destination_property = declared.to_string(),
                    None => self.errors.push(MappingError::UnknownProperty {
                        property: value.destination_property.clone(),
                        owner: type_name::<B>(),
                    }),
                }
            }
        }

        let names: Vec<&str> = mapping.exposed_properties().collect();
        for (position, name) in names.iter().enumerate() {
            if names[..position]
                .iter()
                .any(|earlier| earlier.eq_ignore_ascii_case(name))
            {
                self.errors.push(MappingError::InvalidEntry {
                    property: (*name).to_string(),
                    reason: "mapped more than once".to_string(),
                });
            }
        }

        if let Some(default) = mapping.default_order_by() {
            for token in parse_order_by(default) {
                if !mapping.contains(token.property) {
                    self.errors.push(MappingError::UnmappedProperty {
                        property: token.property.to_string(),
                    });
                }
            }
        }

        self.mappings.insert(key, mapping);
        self
    }

    /// Finish registration.
    ///
    /// # Errors
    ///
    /// Returns the first registration defect found, if any.
    pub fn build(self) -> Result<PropertyMappingRegistry, MappingError> {
        if let Some(error) = self.errors.into_iter().next() {
            tracing::error!(error = %error, "Property mapping registration failed");
            return Err(error);
        }
        tracing::debug!(tables = self.mappings.len(), "Property mapping registry built");
        Ok(PropertyMappingRegistry {
            mappings: self.mappings,
        })
    }
}
