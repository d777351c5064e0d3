use crate::account::{self, PublicUser, SigninForm, SignupForm};
use crate::error::AppError;
use crate::middleware::Identity;
use crate::session::Sessions;
use actix_web::web::{Data, Json};
use actix_web::{get, post, HttpResponse, Responder};
use sea_orm::DatabaseConnection;
use serde::Serialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(signup)
        .service(signin)
        .service(view_user)
        .service(view_profile);
}

#[derive(Serialize)]
struct SessionResponse {
    message: &'static str,
    token: String,
    user: PublicUser,
}

#[derive(Serialize)]
struct UserResponse {
    user: PublicUser,
}

#[post("/signup")]
async fn signup(
    db: Data<DatabaseConnection>,
    sessions: Data<Sessions>,
    form: Json<SignupForm>,
) -> Result<impl Responder, AppError> {
    let (token, user) = account::register(&db, &sessions, form.into_inner()).await?;

    Ok(HttpResponse::Created().json(SessionResponse {
        message: "User created successfully",
        token,
        user,
    }))
}

#[post("/signin")]
async fn signin(
    db: Data<DatabaseConnection>,
    sessions: Data<Sessions>,
    form: Json<SigninForm>,
) -> Result<impl Responder, AppError> {
    let (token, user) = account::login(&db, &sessions, &form).await?;

    Ok(HttpResponse::Ok().json(SessionResponse {
        message: "Login successful",
        token,
        user,
    }))
}

#[get("/user")]
async fn view_user(identity: Identity) -> impl Responder {
    HttpResponse::Ok().json(UserResponse {
        user: PublicUser::from(&identity.user),
    })
}

#[get("/user/profile")]
async fn view_profile(identity: Identity) -> impl Responder {
    HttpResponse::Ok().json(UserResponse {
        user: PublicUser::profile(&identity.user),
    })
}
