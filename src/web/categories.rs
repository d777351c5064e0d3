use super::MessageResponse;
use crate::error::AppError;
use crate::middleware::Identity;
use crate::permission::{authorize, Action, Resource};
use crate::taxonomy::{self, TermForm};
use actix_web::web::{Data, Json, Path};
use actix_web::{delete, get, post, put, HttpResponse, Responder};
use sea_orm::DatabaseConnection;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_categories)
        .service(create_category)
        .service(update_category)
        .service(delete_category);
}

#[get("/categories")]
async fn list_categories(db: Data<DatabaseConnection>) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(taxonomy::categories::list(&db).await?))
}

#[post("/categories")]
async fn create_category(
    identity: Identity,
    db: Data<DatabaseConnection>,
    form: Json<TermForm>,
) -> Result<impl Responder, AppError> {
    authorize(&identity.actor(), &Action::Create, &Resource::Category)?;

    let created = taxonomy::categories::create(&db, identity.id(), &form).await?;
    Ok(HttpResponse::Created().json(created))
}

#[put("/categories/{id}")]
async fn update_category(
    identity: Identity,
    db: Data<DatabaseConnection>,
    path: Path<i32>,
    form: Json<TermForm>,
) -> Result<impl Responder, AppError> {
    let keys = form.keys();
    authorize(&identity.actor(), &Action::Update(&keys), &Resource::Category)?;

    let updated = taxonomy::categories::update(&db, path.into_inner(), &form).await?;
    Ok(HttpResponse::Ok().json(updated))
}

#[delete("/categories/{id}")]
async fn delete_category(
    identity: Identity,
    db: Data<DatabaseConnection>,
    path: Path<i32>,
) -> Result<impl Responder, AppError> {
    authorize(&identity.actor(), &Action::Delete, &Resource::Category)?;

    taxonomy::categories::delete(&db, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Category deleted successfully",
    }))
}
