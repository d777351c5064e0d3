use super::MessageResponse;
use crate::app_config::AppConfig;
use crate::blog::query::{self, ListParams, Page, PostFilter};
use crate::blog::{self, PostForm};
use crate::error::AppError;
use crate::middleware::Identity;
use crate::permission::{authorize, Action, Resource};
use crate::storage::{self, ImageUpload, StorageBackend};
use actix_multipart::Multipart;
use actix_web::web::{Data, Json, Path, Query};
use actix_web::{delete, get, post, put, HttpResponse, Responder};
use futures::{StreamExt, TryStreamExt};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::Value;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // upload-image must be matched before /blogs/{id}.
    conf.service(upload_image)
        .service(list_blogs)
        .service(view_blog)
        .service(create_blog)
        .service(update_blog)
        .service(delete_blog);
}

#[derive(Serialize)]
struct UploadResponse {
    url: String,
}

#[get("/blogs")]
async fn list_blogs(
    db: Data<DatabaseConnection>,
    raw: Query<Vec<(String, String)>>,
) -> Result<impl Responder, AppError> {
    let params = ListParams::from_pairs(raw.into_inner());
    let page = Page::coerce(params.page.as_deref(), params.limit.as_deref());
    let filter = PostFilter::from_params(&params);

    Ok(HttpResponse::Ok().json(query::list_posts(db.get_ref(), &filter, page).await?))
}

#[get("/blogs/{id}")]
async fn view_blog(
    db: Data<DatabaseConnection>,
    path: Path<i32>,
) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(blog::get_post(db.get_ref(), path.into_inner()).await?))
}

#[post("/blogs")]
async fn create_blog(
    identity: Identity,
    db: Data<DatabaseConnection>,
    body: Json<Value>,
) -> Result<impl Responder, AppError> {
    authorize(
        &identity.actor(),
        &Action::Create,
        &Resource::Post { owner_id: None },
    )?;

    let (_, form) = PostForm::from_json(body.into_inner())?;
    let post = blog::create_post(&db, identity.id(), form).await?;

    Ok(HttpResponse::Created().json(post))
}

#[put("/blogs/{id}")]
async fn update_blog(
    identity: Identity,
    db: Data<DatabaseConnection>,
    path: Path<i32>,
    body: Json<Value>,
) -> Result<impl Responder, AppError> {
    let id = path.into_inner();
    let body = body.into_inner();

    // The decision only needs the key set; field values are checked after.
    let keys = PostForm::payload_keys(&body)?;
    let post = blog::find_post(&db, id).await?;
    authorize(
        &identity.actor(),
        &Action::Update(&keys),
        &Resource::Post {
            owner_id: Some(post.created_by),
        },
    )?;
    let (_, form) = PostForm::from_json(body)?;

    Ok(HttpResponse::Ok().json(blog::update_post(&db, id, form).await?))
}

#[delete("/blogs/{id}")]
async fn delete_blog(
    identity: Identity,
    db: Data<DatabaseConnection>,
    path: Path<i32>,
) -> Result<impl Responder, AppError> {
    // Deletion is decided by role alone.
    authorize(
        &identity.actor(),
        &Action::Delete,
        &Resource::Post { owner_id: None },
    )?;

    blog::delete_post(&db, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Blog deleted successfully",
    }))
}

#[post("/blogs/upload-image")]
async fn upload_image(
    identity: Identity,
    config: Data<AppConfig>,
    backend: Data<dyn StorageBackend>,
    mut multipart: Multipart,
) -> Result<impl Responder, AppError> {
    authorize(
        &identity.actor(),
        &Action::Create,
        &Resource::Post { owner_id: None },
    )?;

    let max_bytes = config.limits.max_upload_bytes();

    while let Some(mut field) = multipart.try_next().await.map_err(|e| {
        log::debug!("upload_image: multipart read error: {}", e);
        AppError::Validation("Malformed multipart body".to_owned())
    })? {
        if field.content_disposition().get_name() != Some("image") {
            continue;
        }

        let filename = field.content_disposition().get_filename().map(str::to_owned);
        let content_type = field.content_type().map(|mime| mime.essence_str().to_owned());

        let mut data: Vec<u8> = Vec::new();
        while let Some(chunk) = field.next().await {
            let bytes = chunk.map_err(|e| {
                log::debug!("upload_image: multipart read error: {}", e);
                AppError::Validation("Malformed multipart body".to_owned())
            })?;
            // Stop reading as soon as the limit is passed.
            if data.len() + bytes.len() > max_bytes {
                return Err(AppError::Validation(format!(
                    "Image exceeds the maximum size of {} bytes",
                    max_bytes
                )));
            }
            data.extend_from_slice(&bytes);
        }

        let url = storage::store_image(
            backend.get_ref(),
            ImageUpload {
                filename: filename.as_deref(),
                content_type: content_type.as_deref(),
                data,
            },
            max_bytes,
        )
        .await?;

        log::info!("Image uploaded by user_id={}: {}", identity.id(), url);
        return Ok(HttpResponse::Ok().json(UploadResponse { url }));
    }

    Err(AppError::Validation("No image file uploaded".to_owned()))
}
