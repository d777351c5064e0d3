use super::MessageResponse;
use crate::error::AppError;
use crate::middleware::Identity;
use crate::permission::{authorize, Action, Resource};
use crate::taxonomy::{self, TermForm};
use actix_web::web::{Data, Json, Path};
use actix_web::{delete, get, post, put, HttpResponse, Responder};
use sea_orm::DatabaseConnection;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_tags)
        .service(create_tag)
        .service(update_tag)
        .service(delete_tag);
}

#[get("/tags")]
async fn list_tags(db: Data<DatabaseConnection>) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(taxonomy::tags::list(&db).await?))
}

#[post("/tags")]
async fn create_tag(
    identity: Identity,
    db: Data<DatabaseConnection>,
    form: Json<TermForm>,
) -> Result<impl Responder, AppError> {
    authorize(&identity.actor(), &Action::Create, &Resource::Tag)?;

    let created = taxonomy::tags::create(&db, identity.id(), &form).await?;
    Ok(HttpResponse::Created().json(created))
}

#[put("/tags/{id}")]
async fn update_tag(
    identity: Identity,
    db: Data<DatabaseConnection>,
    path: Path<i32>,
    form: Json<TermForm>,
) -> Result<impl Responder, AppError> {
    let keys = form.keys();
    authorize(&identity.actor(), &Action::Update(&keys), &Resource::Tag)?;

    let updated = taxonomy::tags::update(&db, path.into_inner(), &form).await?;
    Ok(HttpResponse::Ok().json(updated))
}

#[delete("/tags/{id}")]
async fn delete_tag(
    identity: Identity,
    db: Data<DatabaseConnection>,
    path: Path<i32>,
) -> Result<impl Responder, AppError> {
    authorize(&identity.actor(), &Action::Delete, &Resource::Tag)?;

    taxonomy::tags::delete(&db, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Tag deleted successfully",
    }))
}
