use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::HttpServer;
use anyhow::Context;
use blogsmith::app_config::{self, AppConfig};
use blogsmith::session::Sessions;
use blogsmith::storage::local::LocalStorage;
use blogsmith::web::{build_app, AppState};
use env_logger::Env;
use std::path::PathBuf;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_lib_mods();
    app_config::init();

    let config = app_config::get_config();
    let state = init_state(config).await?;
    let bind = state.config.server.bind.to_owned();

    log::info!("Listening on {}", bind);
    HttpServer::new(move || {
        // Middleware is listed in reverse execution order.
        build_app(&state)
            .wrap(
                DefaultHeaders::new()
                    .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
                    .add((header::X_FRAME_OPTIONS, "DENY"))
                    .add(("Referrer-Policy", "strict-origin-when-cross-origin")),
            )
            .wrap(Logger::new("%a \"%r\" %s %b %T"))
    })
    .bind(&bind)
    .with_context(|| format!("Failed to bind {}", bind))?
    .run()
    .await?;

    Ok(())
}

/// Initialize third party crates we rely on but don't have control over.
fn init_lib_mods() {
    // A missing .env file is fine; the environment may be set some other way.
    if let Err(e) = dotenv::dotenv() {
        eprintln!("No .env file loaded: {}", e);
    }
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}

/// Connects to the database and builds everything the workers share.
async fn init_state(mut config: AppConfig) -> anyhow::Result<AppState> {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.database.url = url;
    }

    let db = blogsmith::db::connect(&config.database)
        .await
        .context("Failed to connect to the database")?;
    if config.database.auto_migrate {
        blogsmith::db::create_schema(&db)
            .await
            .context("Failed to create the database schema")?;
        log::info!("Database schema is up to date");
    }

    let storage = LocalStorage::new(
        PathBuf::from(&config.storage.local_path),
        &config.storage.public_url,
    )
    .context("Failed to initialize upload storage")?;

    Ok(AppState {
        db,
        sessions: Sessions::from_config(&config.auth),
        storage: Arc::new(storage),
        config,
    })
}
