//! Database connection pool and schema bootstrap.

use crate::app_config::DatabaseConfig;
use crate::orm::{categories, post_images, post_tags, posts, tags, users};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};

/// Opens the connection pool described by `config`.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.url.to_owned());
    opt.max_connections(config.max_connections)
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    log::info!("Connected to {:?} database", db.get_database_backend());
    Ok(db)
}

/// Creates every table that does not exist yet, parents before children.
pub async fn create_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let tables = vec![
        schema.create_table_from_entity(users::Entity),
        schema.create_table_from_entity(categories::Entity),
        schema.create_table_from_entity(tags::Entity),
        schema.create_table_from_entity(posts::Entity),
        schema.create_table_from_entity(post_tags::Entity),
        schema.create_table_from_entity(post_images::Entity),
    ];

    for mut table in tables {
        table.if_not_exists();
        db.execute(backend.build(&table)).await?;
    }

    Ok(())
}
