//! Test fixtures for creating test data
#![allow(dead_code)]

use blogsmith::account::{self, NewAccount};
use blogsmith::error::AppError;
use blogsmith::orm::posts::{self, PostStatus};
use blogsmith::orm::users::{self, Role};
use blogsmith::orm::{categories, post_tags, tags};
use blogsmith::session::Sessions;
use blogsmith::taxonomy::{self, TermForm};
use chrono::{Duration, NaiveDateTime, Utc};
use sea_orm::{entity::*, ActiveValue::Set, DatabaseConnection};

pub const TEST_PASSWORD: &str = "password123";

/// Create a user with [`TEST_PASSWORD`] and an email derived from the username.
pub async fn create_test_user(
    db: &DatabaseConnection,
    username: &str,
    role: Role,
) -> Result<users::Model, AppError> {
    account::insert_account(
        db,
        NewAccount {
            first_name: "Test".to_owned(),
            last_name: username.to_owned(),
            username: Some(username.to_owned()),
            email: Some(format!("{}@test.com", username)),
            password: TEST_PASSWORD.to_owned(),
            role,
            agree_to_terms: true,
        },
    )
    .await
}

pub fn token_for(sessions: &Sessions, user: &users::Model) -> String {
    sessions
        .issue(user.id, user.email.as_deref(), false)
        .expect("Failed to issue token")
}

pub fn term(name: &str) -> TermForm {
    TermForm {
        name: Some(name.to_owned()),
        description: None,
    }
}

pub async fn create_test_category(
    db: &DatabaseConnection,
    name: &str,
    created_by: i32,
) -> Result<categories::Model, AppError> {
    taxonomy::categories::create(db, created_by, &term(name)).await
}

pub async fn create_test_tag(
    db: &DatabaseConnection,
    name: &str,
    created_by: i32,
) -> Result<tags::Model, AppError> {
    taxonomy::tags::create(db, created_by, &term(name)).await
}

/// Post written straight to the store with a controlled creation time.
pub struct PostSeed<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub category_id: i32,
    pub created_by: i32,
    pub status: PostStatus,
    /// Minutes after a fixed base time.
    pub minute: i64,
    pub tag_ids: &'a [i32],
}

pub fn base_time() -> NaiveDateTime {
    Utc::now().naive_utc() - Duration::days(1)
}

pub async fn insert_post(
    db: &DatabaseConnection,
    base: NaiveDateTime,
    seed: PostSeed<'_>,
) -> Result<posts::Model, AppError> {
    let at = base + Duration::minutes(seed.minute);
    let post = posts::ActiveModel {
        title: Set(seed.title.to_owned()),
        author: Set("Seed Author".to_owned()),
        content: Set(seed.content.to_owned()),
        excerpt: Set(blogsmith::derive::excerpt_from(seed.content)),
        category_id: Set(seed.category_id),
        featured_image: Set(String::new()),
        status: Set(seed.status),
        slug: Set(blogsmith::derive::derive_slug(&format!(
            "{} {}",
            seed.title, seed.minute
        ))),
        views: Set(0),
        created_by: Set(seed.created_by),
        published_at: Set(None),
        created_at: Set(at),
        updated_at: Set(at),
        ..Default::default()
    }
    .insert(db)
    .await?;

    for &tag_id in seed.tag_ids {
        post_tags::ActiveModel {
            post_id: Set(post.id),
            tag_id: Set(tag_id),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(post)
}
