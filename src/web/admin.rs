//! Staff account management. Every route requires the admin role.

use crate::account::{self, PostCounts, PublicUser, StaffForm};
use crate::error::AppError;
use crate::middleware::Identity;
use crate::orm::users::Role;
use crate::permission::{authorize, Action, Resource};
use actix_web::web::{Data, Json};
use actix_web::{get, post, HttpResponse, Responder};
use chrono::NaiveDateTime;
use sea_orm::DatabaseConnection;
use serde::Serialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_admins)
        .service(create_admin)
        .service(list_users)
        .service(create_user);
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AdminEntry {
    id: i32,
    first_name: String,
    last_name: String,
    email: Option<String>,
    created_at: NaiveDateTime,
    counts: PostCounts,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserEntry {
    id: i32,
    first_name: String,
    last_name: String,
    username: Option<String>,
    email: Option<String>,
    role: Role,
    created_at: NaiveDateTime,
    published_count: u64,
    draft_count: u64,
}

#[derive(Serialize)]
struct CreatedResponse {
    message: &'static str,
    user: PublicUser,
}

#[get("/admins")]
async fn list_admins(
    identity: Identity,
    db: Data<DatabaseConnection>,
) -> Result<impl Responder, AppError> {
    authorize(&identity.actor(), &Action::List, &Resource::Staff)?;

    let admins: Vec<AdminEntry> = account::list_staff(&db, &[Role::ChildAdmin])
        .await?
        .into_iter()
        .map(|(user, counts)| AdminEntry {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            created_at: user.created_at,
            counts,
        })
        .collect();

    Ok(HttpResponse::Ok().json(admins))
}

#[post("/admins")]
async fn create_admin(
    identity: Identity,
    db: Data<DatabaseConnection>,
    form: Json<StaffForm>,
) -> Result<impl Responder, AppError> {
    authorize(&identity.actor(), &Action::Create, &Resource::Staff)?;

    let user = account::create_child_admin(&db, form.into_inner()).await?;

    Ok(HttpResponse::Created().json(CreatedResponse {
        message: "Child admin created",
        user: PublicUser::profile(&user),
    }))
}

#[get("/users")]
async fn list_users(
    identity: Identity,
    db: Data<DatabaseConnection>,
) -> Result<impl Responder, AppError> {
    authorize(&identity.actor(), &Action::List, &Resource::Staff)?;

    let users: Vec<UserEntry> = account::list_staff(&db, &[Role::Publisher, Role::Editor])
        .await?
        .into_iter()
        .map(|(user, counts)| UserEntry {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            published_count: counts.published,
            draft_count: counts.draft,
        })
        .collect();

    Ok(HttpResponse::Ok().json(users))
}

#[post("/users")]
async fn create_user(
    identity: Identity,
    db: Data<DatabaseConnection>,
    form: Json<StaffForm>,
) -> Result<impl Responder, AppError> {
    authorize(&identity.actor(), &Action::Create, &Resource::Staff)?;

    let user = account::create_editorial_user(&db, form.into_inner()).await?;

    Ok(HttpResponse::Created().json(CreatedResponse {
        message: "User created successfully",
        user: PublicUser::profile(&user),
    }))
}
