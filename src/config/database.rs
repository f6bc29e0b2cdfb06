//! Database configuration module.
//!
//! This module handles the `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated with `Schema::create_table_from_entity`, so the schema always
//! matches the entity definitions without hand-written SQL.

use crate::entities::{
    GapItem, GqrEntry, ItemMaster, PreGrEntry, PurchaseOrder, Session, SieveSize, Supplier,
    SystemState, Unit, UserProfile,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/onion_procure.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable or the default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    tracing::debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table<E, C>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables that do not exist yet.
///
/// Parent tables are created before the tables that reference them.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, Unit).await?;
    create_table(db, &schema, SieveSize).await?;
    create_table(db, &schema, Supplier).await?;
    create_table(db, &schema, ItemMaster).await?;
    create_table(db, &schema, GapItem).await?;
    create_table(db, &schema, PurchaseOrder).await?;
    create_table(db, &schema, PreGrEntry).await?;
    create_table(db, &schema, GqrEntry).await?;
    create_table(db, &schema, UserProfile).await?;
    create_table(db, &schema, Session).await?;
    create_table(db, &schema, SystemState).await?;

    Ok(())
}
