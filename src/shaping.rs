//! # Data Shaping
//!
//! Partial responses let a client ask for `?fields=genre,name` and receive only those
//! properties. Shaping is driven by an explicit property list per type
//! ([`PropertySchema::PROPERTIES`]) and the type's `serde` representation, so the
//! output keys are exactly the keys the full representation would have used.
//!
//! The identifier property is always present in a [`ShapedEntity`], appended last when
//! the client left it out, so links can be attached to every shaped item.

use std::any::type_name;
use std::fmt;

use serde::Serialize;
use serde::ser::SerializeMap;
use serde_json::Value;

use crate::links::Link;

/// Declared property names of a type, in declaration order.
pub trait PropertySchema {
    const PROPERTIES: &'static [&'static str];

    /// Declared spelling of `name`, matched case-insensitively after trimming.
    #[must_use]
    fn find_property(name: &str) -> Option<&'static str> {
        let name = name.trim();
        Self::PROPERTIES
            .iter()
            .copied()
            .find(|property| property.eq_ignore_ascii_case(name))
    }
}

/// Client-facing type that can be projected into a [`ShapedEntity`].
///
/// Every name in [`PropertySchema::PROPERTIES`] must be a key of the type's serialized
/// JSON object.
pub trait DataShape: PropertySchema + Serialize {
    const ID_PROPERTY: &'static str = "id";

    /// Shape this value.
    ///
    /// # Errors
    ///
    /// See [`shape_data`].
    fn shape(&self, fields: Option<&str>) -> Result<ShapedEntity, ShapeError>
    where
        Self: Sized,
    {
        let properties = requested_properties::<Self>(fields)?;
        shape_with::<Self>(self, &properties)
    }
}

/// Whether every comma-separated name in `fields` is a declared property of `T`.
///
/// An unset or blank clause means "all fields" and is always valid.
#[must_use]
pub fn type_has_properties<T: PropertySchema>(fields: Option<&str>) -> bool {
    match blank_to_none(fields) {
        None => true,
        Some(fields) => fields
            .split(',')
            .all(|field| T::find_property(field).is_some()),
    }
}

/// Shape every item in `items`.
///
/// With no `fields`, each entity carries every declared property in declaration
/// order. Otherwise only the named properties, in the order the client listed them,
/// followed by the identifier if it was not listed.
///
/// # Errors
///
/// Returns [`ShapeError::UnknownField`] when `fields` names an undeclared property.
/// Validate with [`type_has_properties`] first to report that as client error.
pub fn shape_data<T: DataShape>(
    items: &[T],
    fields: Option<&str>,
) -> Result<Vec<ShapedEntity>, ShapeError> {
    let properties = requested_properties::<T>(fields)?;
    items
        .iter()
        .map(|item| shape_with(item, &properties))
        .collect()
}

fn blank_to_none(fields: Option<&str>) -> Option<&str> {
    fields.filter(|fields| !fields.trim().is_empty())
}

fn requested_properties<T: DataShape>(
    fields: Option<&str>,
) -> Result<Vec<&'static str>, ShapeError> {
    let mut properties = match blank_to_none(fields) {
        None => T::PROPERTIES.to_vec(),
        Some(fields) => {
            let mut properties: Vec<&'static str> = Vec::new();
            for field in fields.split(',') {
                let property =
                    T::find_property(field).ok_or_else(|| ShapeError::UnknownField {
                        field: field.trim().to_string(),
                        resource: type_name::<T>(),
                    })?;
                if !properties.contains(&property) {
                    properties.push(property);
                }
            }
            properties
        }
    };
    if !properties.contains(&T::ID_PROPERTY) {
        properties.push(T::ID_PROPERTY);
    }
    Ok(properties)
}

fn shape_with<T: DataShape>(
    item: &T,
    properties: &[&'static str],
) -> Result<ShapedEntity, ShapeError> {
    let Value::Object(mut object) = serde_json::to_value(item)? else {
        return Err(ShapeError::NotAnObject {
            resource: type_name::<T>(),
        });
    };
    let fields = properties
        .iter()
        .map(|&property| {
            object
                .remove(property)
                .map(|value| (property, value))
                .ok_or(ShapeError::MissingValue {
                    property,
                    resource: type_name::<T>(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ShapedEntity {
        id_property: T::ID_PROPERTY,
        fields,
        links: None,
    })
}

/// Ordered field/value projection of a resource, optionally carrying its links.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedEntity {
    id_property: &'static str,
    fields: Vec<(&'static str, Value)>,
    links: Option<Vec<Link>>,
}

impl ShapedEntity {
    /// Value of a field, matched case-insensitively.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(field))
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn id(&self) -> Option<&Value> {
        self.get(self.id_property)
    }

    /// Identifier rendered as a URI path segment. Strings are used verbatim.
    #[must_use]
    pub fn id_segment(&self) -> Option<String> {
        match self.id()? {
            Value::Null => None,
            Value::String(id) => Some(id.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Field names in output order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(name, _)| *name)
    }

    #[must_use]
    pub fn fields(&self) -> &[(&'static str, Value)] {
        &self.fields
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Attach links, serialized under a trailing `links` key.
    #[must_use]
    pub fn with_links(mut self, links: Vec<Link>) -> Self {
        self.links = Some(links);
        self
    }

    #[must_use]
    pub fn links(&self) -> Option<&[Link]> {
        self.links.as_deref()
    }
}

impl Serialize for ShapedEntity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.fields.len() + usize::from(self.links.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        if let Some(links) = &self.links {
            map.serialize_entry("links", links)?;
        }
        map.end()
    }
}

/// Defects found while shaping. Client input is validated beforehand, so any of these
/// reaching a handler is a server error.
#[derive(Debug)]
pub enum ShapeError {
    UnknownField {
        field: String,
        resource: &'static str,
    },
    /// A declared property was absent from the serialized value.
    MissingValue {
        property: &'static str,
        resource: &'static str,
    },
    NotAnObject {
        resource: &'static str,
    },
    Serialization(serde_json::Error),
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField { field, resource } => {
                write!(f, "Field '{field}' is not a property of {resource}")
            }
            Self::MissingValue { property, resource } => {
                write!(f, "{resource} did not serialize declared property '{property}'")
            }
            Self::NotAnObject { resource } => {
                write!(f, "{resource} does not serialize to a JSON object")
            }
            Self::Serialization(err) => write!(f, "Serialization failed: {err}"),
        }
    }
}

impl std::error::Error for ShapeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ShapeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err)
    }
}
