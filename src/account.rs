//! Account registration, login, token resolution and staff management.

use crate::error::AppError;
use crate::orm::posts::{self, PostStatus};
use crate::orm::users::{self, Role};
use crate::session::{self, Sessions};
use chrono::{NaiveDateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

const ACCOUNT_EXISTS: &str = "User already exists with this email or username";
const INVALID_CREDENTIALS: &str = "Invalid username/email or password";

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct SignupForm {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    #[validate(email)]
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub agree_to_terms: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SigninForm {
    /// Username or email.
    pub login_id: String,
    pub password: String,
    pub remember_me: bool,
}

/// Input for accounts created by an administrator.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct StaffForm {
    pub first_name: String,
    pub last_name: String,
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub password: String,
    pub confirm_password: Option<String>,
    pub role: Option<String>,
    pub agree_to_terms: bool,
}

/// Account fields that are safe to return to a client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
}

impl PublicUser {
    /// Public view including the account creation time.
    pub fn profile(user: &users::Model) -> Self {
        Self {
            created_at: Some(user.created_at),
            ..Self::from(user)
        }
    }
}

impl From<&users::Model> for PublicUser {
    fn from(user: &users::Model) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
            username: user.username.to_owned(),
            email: user.email.to_owned(),
            role: user.role,
            created_at: None,
        }
    }
}

/// A fully validated account ready to be written.
pub struct NewAccount {
    pub first_name: String,
    pub last_name: String,
    pub username: Option<String>,
    pub email: Option<String>,
    /// Plain text; hashed by [`insert_account`].
    pub password: String,
    pub role: Role,
    pub agree_to_terms: bool,
}

/// Number of posts owned by a staff account, by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PostCounts {
    pub total: u64,
    pub published: u64,
    pub draft: u64,
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Trims an optional field, treating blank input as absent.
fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Advisory check for an existing account with the same email or username.
/// The unique indexes remain the authority; see [`insert_account`].
async fn ensure_available(
    db: &DatabaseConnection,
    email: Option<&str>,
    username: Option<&str>,
) -> Result<(), AppError> {
    let mut cond = Condition::any();
    if let Some(email) = email {
        cond = cond.add(users::Column::Email.eq(email));
    }
    if let Some(username) = username {
        cond = cond.add(users::Column::Username.eq(username));
    }
    if email.is_none() && username.is_none() {
        return Ok(());
    }

    match users::Entity::find().filter(cond).one(db).await? {
        Some(_) => Err(AppError::Conflict(ACCOUNT_EXISTS.to_owned())),
        None => Ok(()),
    }
}

/// Hashes the password and writes the account. A unique index violation is
/// reported as `Conflict`, even when no pre-check ran or a concurrent writer
/// slipped in after it.
pub async fn insert_account(
    db: &DatabaseConnection,
    account: NewAccount,
) -> Result<users::Model, AppError> {
    let password = session::hash_password(&account.password)?;
    let now = Utc::now().naive_utc();

    let user = users::ActiveModel {
        first_name: Set(account.first_name),
        last_name: Set(account.last_name),
        username: Set(account.username),
        email: Set(account.email),
        password: Set(password),
        role: Set(account.role),
        agree_to_terms: Set(account.agree_to_terms),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let user = user
        .insert(db)
        .await
        .map_err(|e| AppError::from_write(e, ACCOUNT_EXISTS))?;

    log::info!(
        "New account created: user_id={} role={}",
        user.id,
        user.role.as_str()
    );
    Ok(user)
}

/// Self-service signup. Returns a session token and the public view of the
/// new account, which always gets the default role.
pub async fn register(
    db: &DatabaseConnection,
    sessions: &Sessions,
    form: SignupForm,
) -> Result<(String, PublicUser), AppError> {
    if [
        &form.first_name,
        &form.last_name,
        &form.username,
        &form.email,
        &form.password,
        &form.confirm_password,
    ]
    .iter()
    .any(|v| is_blank(v))
    {
        return Err(AppError::Validation("All fields are required".to_owned()));
    }
    if form.password != form.confirm_password {
        return Err(AppError::Validation("Passwords do not match".to_owned()));
    }
    if !form.agree_to_terms {
        return Err(AppError::Validation(
            "You must agree to the terms and conditions".to_owned(),
        ));
    }
    form.validate().map_err(|e| {
        log::debug!("Signup validation failed: {}", e);
        AppError::Validation("Invalid email address".to_owned())
    })?;

    let email = normalize_email(&form.email);
    let username = form.username.trim().to_owned();
    ensure_available(db, Some(&email), Some(&username)).await?;

    let user = insert_account(
        db,
        NewAccount {
            first_name: form.first_name.trim().to_owned(),
            last_name: form.last_name.trim().to_owned(),
            username: Some(username),
            email: Some(email),
            password: form.password,
            role: Role::default(),
            agree_to_terms: true,
        },
    )
    .await?;

    let token = sessions.issue(user.id, user.email.as_deref(), false)?;
    Ok((token, PublicUser::from(&user)))
}

/// Password login by username or email.
pub async fn login(
    db: &DatabaseConnection,
    sessions: &Sessions,
    form: &SigninForm,
) -> Result<(String, PublicUser), AppError> {
    let login_id = form.login_id.trim();
    if login_id.is_empty() || form.password.is_empty() {
        return Err(AppError::Validation(
            "Username/email and password are required".to_owned(),
        ));
    }

    let user = users::Entity::find()
        .filter(
            Condition::any()
                .add(users::Column::Email.eq(normalize_email(login_id)))
                .add(users::Column::Username.eq(login_id)),
        )
        .one(db)
        .await?;

    // Unknown account and wrong password must be indistinguishable.
    let user = match user {
        Some(user) if session::verify_password(&form.password, &user.password) => user,
        _ => {
            log::debug!("login failure for {}", login_id);
            return Err(AppError::Authentication(INVALID_CREDENTIALS.to_owned()));
        }
    };

    let token = sessions.issue(user.id, user.email.as_deref(), form.remember_me)?;
    Ok((token, PublicUser::from(&user)))
}

/// Resolves a bearer token to the current account, freshly read from the store.
pub async fn resolve_token(
    db: &DatabaseConnection,
    sessions: &Sessions,
    token: &str,
) -> Result<users::Model, AppError> {
    let claims = sessions.verify(token)?;

    users::Entity::find_by_id(claims.user_id)
        .one(db)
        .await?
        .ok_or_else(|| {
            log::debug!("token for missing user_id={}", claims.user_id);
            AppError::unauthenticated()
        })
}

/// Creates a `childadmin` account. Email is the login for these accounts.
pub async fn create_child_admin(
    db: &DatabaseConnection,
    form: StaffForm,
) -> Result<users::Model, AppError> {
    let email = non_blank(&form.email).map(|e| normalize_email(&e));
    let email = match email {
        Some(email)
            if !is_blank(&form.first_name)
                && !is_blank(&form.last_name)
                && !form.password.is_empty() =>
        {
            email
        }
        _ => return Err(AppError::Validation("Required fields missing".to_owned())),
    };
    form.validate().map_err(|e| {
        log::debug!("Staff validation failed: {}", e);
        AppError::Validation("Invalid email address".to_owned())
    })?;

    ensure_available(db, Some(&email), None).await?;

    insert_account(
        db,
        NewAccount {
            first_name: form.first_name.trim().to_owned(),
            last_name: form.last_name.trim().to_owned(),
            username: non_blank(&form.username),
            email: Some(email),
            password: form.password,
            role: Role::ChildAdmin,
            agree_to_terms: form.agree_to_terms,
        },
    )
    .await
}

/// Creates a `publisher` or `editor` account. Email is optional.
pub async fn create_editorial_user(
    db: &DatabaseConnection,
    form: StaffForm,
) -> Result<users::Model, AppError> {
    let username = non_blank(&form.username);
    let confirm_password = form.confirm_password.clone().unwrap_or_default();
    let role = non_blank(&form.role);

    let (username, role) = match (username, role) {
        (Some(username), Some(role))
            if !is_blank(&form.first_name)
                && !is_blank(&form.last_name)
                && !form.password.is_empty()
                && !confirm_password.is_empty() =>
        {
            (username, role)
        }
        _ => {
            return Err(AppError::Validation(
                "First name, last name, username, password, confirm password, and role are required"
                    .to_owned(),
            ))
        }
    };
    if form.password != confirm_password {
        return Err(AppError::Validation("Passwords do not match".to_owned()));
    }
    let role = match role.parse::<Role>() {
        Ok(role @ (Role::Publisher | Role::Editor)) => role,
        _ => return Err(AppError::Validation("Invalid role".to_owned())),
    };
    form.validate().map_err(|e| {
        log::debug!("Staff validation failed: {}", e);
        AppError::Validation("Invalid email address".to_owned())
    })?;

    let email = non_blank(&form.email).map(|e| normalize_email(&e));
    ensure_available(db, email.as_deref(), Some(&username)).await?;

    insert_account(
        db,
        NewAccount {
            first_name: form.first_name.trim().to_owned(),
            last_name: form.last_name.trim().to_owned(),
            username: Some(username),
            email,
            password: form.password,
            role,
            agree_to_terms: true,
        },
    )
    .await
}

/// Staff accounts with one of `roles`, oldest first, with their post counts.
pub async fn list_staff(
    db: &DatabaseConnection,
    roles: &[Role],
) -> Result<Vec<(users::Model, PostCounts)>, AppError> {
    let staff = users::Entity::find()
        .filter(users::Column::Role.is_in(roles.iter().copied()))
        .order_by_asc(users::Column::CreatedAt)
        .order_by_asc(users::Column::Id)
        .all(db)
        .await?;

    let counts = futures::future::try_join_all(staff.iter().map(|user| count_posts(db, user.id)))
        .await?;

    Ok(staff.into_iter().zip(counts).collect())
}

async fn count_posts(db: &DatabaseConnection, user_id: i32) -> Result<PostCounts, AppError> {
    let count_with = |status: PostStatus| {
        posts::Entity::find()
            .filter(posts::Column::CreatedBy.eq(user_id))
            .filter(posts::Column::Status.eq(status))
            .count(db)
    };

    let published = count_with(PostStatus::Published).await?;
    let draft = count_with(PostStatus::Draft).await?;

    Ok(PostCounts {
        total: published + draft,
        published,
        draft,
    })
}
