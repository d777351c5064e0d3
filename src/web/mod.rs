pub mod account;
pub mod admin;
pub mod blogs;
pub mod categories;
pub mod tags;

use crate::app_config::AppConfig;
use crate::error::AppError;
use crate::session::Sessions;
use crate::storage::StorageBackend;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::web::{self, Data};
use actix_web::App;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;

/// Shared state handed to every worker.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub sessions: Sessions,
    pub storage: Arc<dyn StorageBackend>,
    pub config: AppConfig,
}

/// Body of responses that only confirm an action.
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Configures the web app by adding services from each web file.
///
/// Every route lives under `/api`.
pub fn configure(conf: &mut web::ServiceConfig) {
    conf.service(
        web::scope("/api")
            .configure(account::configure)
            .configure(admin::configure)
            .configure(blogs::configure)
            .configure(categories::configure)
            .configure(tags::configure),
    );
}

/// Builds the application with its shared data, extractor error handling,
/// routes and the static handler for uploaded images.
pub fn build_app(
    state: &AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let storage: Data<dyn StorageBackend> = Data::from(state.storage.clone());

    let mut app = App::new()
        .app_data(Data::new(state.db.clone()))
        .app_data(Data::new(state.sessions.clone()))
        .app_data(Data::new(state.config.clone()))
        .app_data(storage)
        .app_data(web::JsonConfig::default().error_handler(|err, _req| {
            AppError::Validation(format!("Invalid request body: {}", err)).into()
        }))
        .app_data(web::QueryConfig::default().error_handler(|err, _req| {
            AppError::Validation(format!("Invalid query string: {}", err)).into()
        }))
        .app_data(web::PathConfig::default().error_handler(|err, _req| {
            log::debug!("Rejected path parameter: {}", err);
            AppError::Validation("Invalid id".to_owned()).into()
        }))
        .configure(configure);

    // Only a path prefix can be served from here; a full URL points elsewhere.
    let public_url = &state.config.storage.public_url;
    if public_url.starts_with('/') {
        app = app.service(actix_files::Files::new(
            public_url.trim_end_matches('/'),
            &state.config.storage.local_path,
        ));
    }

    app
}
