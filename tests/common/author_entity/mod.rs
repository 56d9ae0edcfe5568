use axum::{
    Json,
    extract::{Path, Query, State},
    http::Method,
};
use chrono::{Datelike, NaiveDate, Utc};
use hyper::HeaderMap;
use sea_orm::{
    Condition,
    entity::prelude::*,
    sea_query::{Expr, Func},
};
use serde::{Deserialize, Serialize};
use shapecrate::errors::ApiError;
use shapecrate::models::{QueryFilters, ResourceQueryParameters};
use shapecrate::routes::{CollectionResponse, ResponseMode, validate_fields};
use shapecrate::{
    DataShape, EntitySource, LinkAction, PropertyMapping, PropertyMappingRegistry,
    PropertyMappingValue, PropertySchema, ShapedEntity, ShapedResource,
};

use super::AppState;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "authors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// ISO 8601 date, so string order is date order.
    pub date_of_birth: String,
    pub genre: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl PropertySchema for Model {
    const PROPERTIES: &'static [&'static str] =
        &["id", "first_name", "last_name", "date_of_birth", "genre"];
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorDto {
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    pub genre: String,
}

impl From<Model> for AuthorDto {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: format!("{} {}", model.first_name, model.last_name),
            age: age_on(&model.date_of_birth, Utc::now().date_naive()),
            genre: model.genre,
        }
    }
}

fn age_on(date_of_birth: &str, today: NaiveDate) -> i32 {
    let Ok(born) = NaiveDate::parse_from_str(date_of_birth, "%Y-%m-%d") else {
        return 0;
    };
    let mut age = today.year() - born.year();
    if (today.month(), today.day()) < (born.month(), born.day()) {
        age -= 1;
    }
    age
}

impl PropertySchema for AuthorDto {
    const PROPERTIES: &'static [&'static str] = &["id", "name", "age", "genre"];
}

impl DataShape for AuthorDto {}

impl ShapedResource for AuthorDto {
    type Backing = Model;
    type Filters = AuthorFilters;

    const RESOURCE_NAME_SINGULAR: &'static str = "author";
    const RESOURCE_NAME_PLURAL: &'static str = "authors";

    fn item_actions() -> Vec<LinkAction> {
        vec![
            LinkAction::new("delete_author", Method::DELETE),
            LinkAction::new("create_book_for_author", Method::POST).at("books"),
            LinkAction::new("books", Method::GET).at("books"),
        ]
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorFilters {
    pub genre: Option<String>,
    pub search_query: Option<String>,
}

impl AuthorFilters {
    fn genre(&self) -> Option<&str> {
        self.genre.as_deref().map(str::trim).filter(|g| !g.is_empty())
    }

    fn search_query(&self) -> Option<&str> {
        self.search_query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    /// Genre matches ignoring case; the search query is a substring of any name or
    /// the genre.
    pub fn condition(&self) -> Condition {
        let mut condition = Condition::all();
        if let Some(genre) = self.genre() {
            condition = condition.add(
                Expr::expr(Func::lower(Expr::col(Column::Genre))).eq(genre.to_lowercase()),
            );
        }
        if let Some(search_query) = self.search_query() {
            condition = condition.add(
                Condition::any()
                    .add(Column::FirstName.contains(search_query))
                    .add(Column::LastName.contains(search_query))
                    .add(Column::Genre.contains(search_query)),
            );
        }
        condition
    }
}

impl QueryFilters for AuthorFilters {
    /// Echoes the values as sent.
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

pub fn registry() -> PropertyMappingRegistry {
    PropertyMappingRegistry::builder()
        .register::<AuthorDto, Model>(
            PropertyMapping::new()
                .map("id", [PropertyMappingValue::new("id")])
                .map("genre", [PropertyMappingValue::new("genre")])
                .map("age", [PropertyMappingValue::reversed("date_of_birth")])
                .map(
                    "name",
                    [
                        PropertyMappingValue::new("last_name"),
                        PropertyMappingValue::new("first_name"),
                    ],
                )
                .with_default_order_by("name"),
        )
        .build()
        .expect("author mapping is valid")
}

pub async fn get_authors(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ResourceQueryParameters<AuthorFilters>>,
) -> Result<CollectionResponse, ApiError> {
    let select = Entity::find().filter(params.filters.condition());
    let source = EntitySource::from_select(select, &state.db);
    state
        .engine
        .collection::<AuthorDto, _>(
            &state.links,
            &params,
            source,
            ResponseMode::from_headers(&headers),
        )
        .await
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemQuery {
    pub fields: Option<String>,
}

pub async fn get_author(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ItemQuery>,
) -> Result<Json<ShapedEntity>, ApiError> {
    validate_fields::<AuthorDto>(query.fields.as_deref())?;
    let author = Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Author", Some(id.to_string())))?;
    let dto = AuthorDto::from(author);
    Ok(Json(state.engine.item(
        &state.links,
        &dto,
        query.fields.as_deref(),
    )?))
}

