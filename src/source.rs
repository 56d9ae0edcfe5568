use std::any::type_name;
use std::str::FromStr;

use async_trait::async_trait;
use sea_orm::{
    DatabaseConnection, DbErr, EntityTrait, Iterable, Order, PaginatorTrait, PrimaryKeyToColumn,
    QueryOrder, QuerySelect, Select,
};

use crate::mapping::MappingError;
use crate::sort::{SortKey, SortableEntity, compose_comparator};

/// A query over backing data that can be ordered, counted, and sliced into pages.
///
/// Ordering keys are recorded by [`QuerySource::apply_sort`] and take effect when
/// the source is sliced. Counting ignores ordering.
#[async_trait]
pub trait QuerySource: Sized + Send + Sync {
    type Item: Send;

    /// Add ordering keys after any already applied.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::UnknownProperty`] if a key names a property the
    /// backing data cannot be ordered by.
    fn apply_sort(self, keys: &[SortKey]) -> Result<Self, MappingError>;

    async fn count(&self) -> Result<u64, DbErr>;

    /// Items at `offset..offset + limit` in the applied order.
    async fn slice(self, offset: u64, limit: u64) -> Result<Vec<Self::Item>, DbErr>;
}

/// Source over items already held in memory. Sorting is stable, so items that
/// compare equal on every key keep their original order.
#[derive(Debug, Clone)]
pub struct InMemorySource<T> {
    items: Vec<T>,
    keys: Vec<SortKey>,
}

impl<T> InMemorySource<T> {
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            keys: Vec::new(),
        }
    }

    /// Keep only the items matching `predicate`.
    #[must_use]
    pub fn filter(mut self, predicate: impl FnMut(&T) -> bool) -> Self {
        self.items.retain(predicate);
        self
    }

    #[must_use]
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }
}

impl<T> From<Vec<T>> for InMemorySource<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

#[async_trait]
impl<T> QuerySource for InMemorySource<T>
where
    T: SortableEntity + Send + Sync,
{
    type Item = T;

    fn apply_sort(mut self, keys: &[SortKey]) -> Result<Self, MappingError> {
        for key in keys {
            let property =
                T::find_property(&key.property).ok_or_else(|| MappingError::UnknownProperty {
                    property: key.property.clone(),
                    owner: type_name::<T>(),
                })?;
            self.keys.push(SortKey::new(property, key.direction));
        }
        Ok(self)
    }

    async fn count(&self) -> Result<u64, DbErr> {
        u64::try_from(self.items.len()).map_err(|err| DbErr::Custom(err.to_string()))
    }

    async fn slice(mut self, offset: u64, limit: u64) -> Result<Vec<T>, DbErr> {
        if !self.keys.is_empty() {
            self.items.sort_by(compose_comparator(&self.keys));
        }
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self.items.into_iter().skip(offset).take(limit).collect())
    }
}

/// Source over a Sea-ORM select. Ordering keys name entity columns and are pushed
/// into the `ORDER BY` clause; the primary key is appended ascending when sliced so
/// rows that tie on every key still page deterministically.
#[derive(Debug, Clone)]
pub struct EntitySource<'db, E: EntityTrait> {
    select: Select<E>,
    db: &'db DatabaseConnection,
}

impl<'db, E: EntityTrait> EntitySource<'db, E> {
    /// Source over every row of `E`.
    #[must_use]
    pub fn new(db: &'db DatabaseConnection) -> Self {
        Self::from_select(E::find(), db)
    }

    /// Source over an already filtered select.
    #[must_use]
    pub fn from_select(select: Select<E>, db: &'db DatabaseConnection) -> Self {
        Self { select, db }
    }

    #[must_use]
    pub fn into_select(self) -> Select<E> {
        self.select
    }
}

#[async_trait]
impl<'db, E> QuerySource for EntitySource<'db, E>
where
    E: EntityTrait,
    E::Model: Sync + 'db,
{
    type Item = E::Model;

    fn apply_sort(mut self, keys: &[SortKey]) -> Result<Self, MappingError> {
        for key in keys {
            let column =
                E::Column::from_str(&key.property).map_err(|_| MappingError::UnknownProperty {
                    property: key.property.clone(),
                    owner: type_name::<E>(),
                })?;
            self.select = self.select.order_by(column, key.direction.into());
        }
        Ok(self)
    }

    async fn count(&self) -> Result<u64, DbErr> {
        PaginatorTrait::count(self.select.clone(), self.db).await
    }

    async fn slice(self, offset: u64, limit: u64) -> Result<Vec<E::Model>, DbErr> {
        let mut select = self.select;
        for primary_key in E::PrimaryKey::iter() {
            select = select.order_by(primary_key.into_column(), Order::Asc);
        }
        select.offset(offset).limit(limit).all(self.db).await
    }
}
