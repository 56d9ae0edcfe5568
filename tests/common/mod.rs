use axum::{Router, routing::get};
use sea_orm::{ActiveValue::Set, Database, DatabaseConnection, DbErr, EntityTrait};
use sea_orm_migration::prelude::*;
use shapecrate::{QueryEngine, ResourceLinkBuilder};
use uuid::Uuid;

pub mod author_entity;

pub const AUTHORS_URL: &str = "http://localhost/api/authors";

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub engine: QueryEngine,
    pub links: ResourceLinkBuilder,
}

/// Routes engine logs through the test harness's captured output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_test_writer()
        .compact()
        .try_init();
}

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    init_tracing();
    let db = Database::connect("sqlite::memory:").await?;

    // Run migrations
    Migrator::up(&db, None).await?;

    Ok(db)
}

/// Database seeded with [`seed_authors`].
pub async fn setup_seeded_db() -> Result<DatabaseConnection, DbErr> {
    let db = setup_test_db().await?;
    seed_authors(&db).await?;
    Ok(db)
}

pub fn setup_test_app(db: DatabaseConnection) -> Router {
    use author_entity::{get_author, get_authors};

    let state = AppState {
        db,
        engine: QueryEngine::new(author_entity::registry()),
        links: ResourceLinkBuilder::new(AUTHORS_URL).expect("valid collection URL"),
    };

    let api = Router::new()
        .route("/authors", get(get_authors))
        .route("/authors/{id}", get(get_author))
        .with_state(state);

    Router::new().nest("/api", api)
}

pub fn author_id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

/// (first name, last name, date of birth, genre), inserted with ids 1..=5.
pub const AUTHORS: [(&str, &str, &str, &str); 5] = [
    ("Jane", "Doe", "1980-03-01", "Fantasy"),
    ("Amy", "Doe", "1990-06-15", "Horror"),
    ("Bo", "Lee", "1975-11-30", "Fantasy"),
    ("Stephen", "King", "1947-09-21", "Horror"),
    ("Ursula", "Le Guin", "1929-10-21", "Fantasy"),
];

pub async fn seed_authors(db: &DatabaseConnection) -> Result<(), DbErr> {
    let models = (1..).zip(AUTHORS).map(
        |(n, (first_name, last_name, date_of_birth, genre))| author_entity::ActiveModel {
            id: Set(author_id(n)),
            first_name: Set(first_name.to_string()),
            last_name: Set(last_name.to_string()),
            date_of_birth: Set(date_of_birth.to_string()),
            genre: Set(genre.to_string()),
        },
    );
    author_entity::Entity::insert_many(models)
        .exec_without_returning(db)
        .await?;
    Ok(())
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateAuthorTable)]
    }
}

pub struct CreateAuthorTable;

impl MigrationName for CreateAuthorTable {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_author_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateAuthorTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(Authors::Table)
            .if_not_exists()
            .col(ColumnDef::new(Authors::Id).uuid().not_null().primary_key())
            .col(ColumnDef::new(Authors::FirstName).string().not_null())
            .col(ColumnDef::new(Authors::LastName).string().not_null())
            .col(ColumnDef::new(Authors::DateOfBirth).string().not_null())
            .col(ColumnDef::new(Authors::Genre).string().not_null())
            .to_owned();

        manager.create_table(table).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Authors::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Authors {
    Table,
    Id,
    FirstName,
    LastName,
    DateOfBirth,
    Genre,
}
