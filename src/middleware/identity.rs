//! Resolves the `Authorization: Bearer` header to the calling account.

use crate::account;
use crate::error::AppError;
use crate::orm::users;
use crate::permission::Actor;
use crate::session::Sessions;
use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::web::Data;
use actix_web::{FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use sea_orm::DatabaseConnection;

/// The authenticated account of a request. Extracting it fails with an
/// authentication error when the token is absent, invalid or expired, or
/// when its account no longer exists.
#[derive(Clone, Debug)]
pub struct Identity {
    pub user: users::Model,
}

impl Identity {
    pub fn actor(&self) -> Actor {
        Actor::from(&self.user)
    }

    pub fn id(&self) -> i32 {
        self.user.id
    }
}

/// Token carried by an `Authorization: Bearer <token>` header.
pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();

    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token.to_owned())
    } else {
        None
    }
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = bearer_token(req);
        let db = req.app_data::<Data<DatabaseConnection>>().cloned();
        let sessions = req.app_data::<Data<Sessions>>().cloned();

        Box::pin(async move {
            let (db, sessions) = match (db, sessions) {
                (Some(db), Some(sessions)) => (db, sessions),
                _ => {
                    log::error!("Identity extractor used without database or session data");
                    return Err(AppError::Server("Internal server error".to_owned()));
                }
            };
            let token = token.ok_or_else(AppError::unauthenticated)?;
            let user = account::resolve_token(&db, &sessions, &token).await?;

            Ok(Identity { user })
        })
    }
}
