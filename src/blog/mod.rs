//! Post writes: validation, slug/excerpt derivation, tag and image sets.

pub mod fields;
pub mod query;

pub use query::{get_post, list_posts, PostView};

use crate::derive;
use crate::error::AppError;
use crate::orm::posts::{self, PostStatus};
use crate::orm::{categories, post_images, post_tags, tags};
use chrono::{NaiveDateTime, Utc};
use fields::{lenient_list, IdRef};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;

const SLUG_TAKEN: &str = "A blog with this title already exists";

/// Post create/update payload. Absent fields are `None`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostForm {
    pub title: Option<String>,
    pub author: Option<String>,
    pub content: Option<String>,
    /// Only honoured on create.
    pub excerpt: Option<String>,
    pub category: Option<IdRef>,
    #[serde(deserialize_with = "lenient_list")]
    pub tags: Option<Vec<IdRef>>,
    pub featured_image: Option<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub images: Option<Vec<String>>,
    pub status: Option<String>,
}

impl PostForm {
    /// Keys carried by a JSON object payload, before any field is decoded.
    pub fn payload_keys(value: &Value) -> Result<BTreeSet<String>, AppError> {
        match value {
            Value::Object(map) => Ok(map.keys().cloned().collect()),
            _ => Err(AppError::Validation(
                "Request body must be a JSON object".to_owned(),
            )),
        }
    }

    /// Decodes a JSON object, also returning the set of keys it carried.
    pub fn from_json(value: Value) -> Result<(BTreeSet<String>, Self), AppError> {
        let keys = Self::payload_keys(&value)?;

        let form = serde_json::from_value(value).map_err(|e| {
            log::debug!("Rejected post payload: {}", e);
            AppError::Validation(format!("Invalid request body: {}", e))
        })?;

        Ok((keys, form))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn parse_status(raw: &str) -> Result<PostStatus, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("Invalid status '{}'", raw)))
}

/// Publish time after a write that leaves the post in `status`. Once set it
/// is kept, whatever the status.
pub fn published_at_after(
    current: Option<NaiveDateTime>,
    status: PostStatus,
    now: NaiveDateTime,
) -> Option<NaiveDateTime> {
    match (current, status) {
        (Some(at), _) => Some(at),
        (None, PostStatus::Published) => Some(now),
        (None, PostStatus::Draft) => None,
    }
}

async fn ensure_category<C: ConnectionTrait>(db: &C, category: &IdRef) -> Result<i32, AppError> {
    let missing = || AppError::Validation("Category does not exist".to_owned());

    let id = category.to_id().ok_or_else(missing)?;
    match categories::Entity::find_by_id(id).one(db).await? {
        Some(_) => Ok(id),
        None => Err(missing()),
    }
}

/// Checks that every referenced tag exists. Duplicates collapse.
async fn ensure_tags<C: ConnectionTrait>(
    db: &C,
    refs: &[IdRef],
) -> Result<BTreeSet<i32>, AppError> {
    let missing = || AppError::Validation("One or more tags do not exist".to_owned());

    let ids = refs
        .iter()
        .map(|r| r.to_id().ok_or_else(missing))
        .collect::<Result<BTreeSet<i32>, _>>()?;
    if ids.is_empty() {
        return Ok(ids);
    }

    let found = tags::Entity::find()
        .filter(tags::Column::Id.is_in(ids.iter().copied()))
        .count(db)
        .await?;
    if found != ids.len() as u64 {
        return Err(missing());
    }

    Ok(ids)
}

async fn replace_tags<C: ConnectionTrait>(
    conn: &C,
    post_id: i32,
    tag_ids: &BTreeSet<i32>,
) -> Result<(), AppError> {
    post_tags::Entity::delete_many()
        .filter(post_tags::Column::PostId.eq(post_id))
        .exec(conn)
        .await?;

    if !tag_ids.is_empty() {
        post_tags::Entity::insert_many(tag_ids.iter().map(|&tag_id| post_tags::ActiveModel {
            post_id: Set(post_id),
            tag_id: Set(tag_id),
            ..Default::default()
        }))
        .exec(conn)
        .await?;
    }

    Ok(())
}

async fn replace_images<C: ConnectionTrait>(
    conn: &C,
    post_id: i32,
    urls: &[String],
) -> Result<(), AppError> {
    post_images::Entity::delete_many()
        .filter(post_images::Column::PostId.eq(post_id))
        .exec(conn)
        .await?;

    if !urls.is_empty() {
        post_images::Entity::insert_many(urls.iter().enumerate().map(|(position, url)| {
            post_images::ActiveModel {
                post_id: Set(post_id),
                position: Set(position as i32),
                url: Set(url.to_owned()),
                ..Default::default()
            }
        }))
        .exec(conn)
        .await?;
    }

    Ok(())
}

/// Creates a post owned by `created_by`.
pub async fn create_post(
    db: &DatabaseConnection,
    created_by: i32,
    form: PostForm,
) -> Result<PostView, AppError> {
    let (title, author, content, category) = match (
        non_blank(&form.title),
        non_blank(&form.author),
        non_blank(&form.content),
        form.category.as_ref().filter(|c| !c.is_blank()),
    ) {
        (Some(title), Some(author), Some(content), Some(category)) => {
            (title, author, content, category)
        }
        _ => {
            return Err(AppError::Validation(
                "Title, author, content, and category are required".to_owned(),
            ))
        }
    };

    let status = match non_blank(&form.status) {
        Some(raw) => parse_status(raw)?,
        None => PostStatus::default(),
    };
    let category_id = ensure_category(db, category).await?;
    let tag_ids = match &form.tags {
        Some(refs) => ensure_tags(db, refs).await?,
        None => BTreeSet::new(),
    };

    let excerpt = match non_blank(&form.excerpt) {
        Some(excerpt) => excerpt.trim().to_owned(),
        None => derive::excerpt_from(content),
    };
    let now = Utc::now().naive_utc();

    let post = posts::ActiveModel {
        title: Set(title.to_owned()),
        author: Set(author.to_owned()),
        content: Set(content.to_owned()),
        excerpt: Set(excerpt),
        category_id: Set(category_id),
        featured_image: Set(form.featured_image.clone().unwrap_or_default()),
        status: Set(status),
        slug: Set(derive::derive_slug(title)),
        views: Set(0),
        created_by: Set(created_by),
        published_at: Set(published_at_after(None, status, now)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let txn = db.begin().await?;
    let post = post
        .insert(&txn)
        .await
        .map_err(|e| AppError::from_write(e, SLUG_TAKEN))?;
    replace_tags(&txn, post.id, &tag_ids).await?;
    replace_images(&txn, post.id, form.images.as_deref().unwrap_or_default()).await?;
    txn.commit().await?;

    log::info!(
        "Post created: post_id={} created_by={} status={:?}",
        post.id,
        created_by,
        status
    );
    get_post(db, post.id).await
}

/// Loads a post for an ownership check before an update or delete.
pub async fn find_post(db: &DatabaseConnection, id: i32) -> Result<posts::Model, AppError> {
    posts::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Blog not found".to_owned()))
}

/// Applies the supplied fields of `form` to post `id`.
pub async fn update_post(
    db: &DatabaseConnection,
    id: i32,
    form: PostForm,
) -> Result<PostView, AppError> {
    let post = find_post(db, id).await?;

    let category_id = match form.category.as_ref().filter(|c| !c.is_blank()) {
        Some(category) => Some(ensure_category(db, category).await?),
        None => None,
    };
    let tag_ids = match &form.tags {
        Some(refs) => Some(ensure_tags(db, refs).await?),
        None => None,
    };
    let status = match non_blank(&form.status) {
        Some(raw) => Some(parse_status(raw)?),
        None => None,
    };

    let now = Utc::now().naive_utc();
    let mut active: posts::ActiveModel = post.clone().into();

    if let Some(category_id) = category_id {
        active.category_id = Set(category_id);
    }
    if let Some(title) = non_blank(&form.title) {
        if title != post.title {
            active.title = Set(title.to_owned());
            active.slug = Set(derive::derive_slug(title));
        }
    }
    if let Some(author) = non_blank(&form.author) {
        active.author = Set(author.to_owned());
    }
    if let Some(content) = non_blank(&form.content) {
        if content != post.content {
            active.content = Set(content.to_owned());
            if post.excerpt.is_empty() {
                active.excerpt = Set(derive::excerpt_from(content));
            }
        }
    }
    if let Some(featured_image) = &form.featured_image {
        active.featured_image = Set(featured_image.to_owned());
    }
    if let Some(status) = status {
        active.status = Set(status);
        active.published_at = Set(published_at_after(post.published_at, status, now));
    }
    active.updated_at = Set(now);

    let txn = db.begin().await?;
    active
        .update(&txn)
        .await
        .map_err(|e| AppError::from_write(e, SLUG_TAKEN))?;
    if let Some(tag_ids) = &tag_ids {
        replace_tags(&txn, id, tag_ids).await?;
    }
    if let Some(images) = &form.images {
        replace_images(&txn, id, images).await?;
    }
    txn.commit().await?;

    log::info!("Post updated: post_id={}", id);
    get_post(db, id).await
}

/// Deletes a post together with its tag links and images.
pub async fn delete_post(db: &DatabaseConnection, id: i32) -> Result<(), AppError> {
    let post = find_post(db, id).await?;

    let txn = db.begin().await?;
    post_tags::Entity::delete_many()
        .filter(post_tags::Column::PostId.eq(post.id))
        .exec(&txn)
        .await?;
    post_images::Entity::delete_many()
        .filter(post_images::Column::PostId.eq(post.id))
        .exec(&txn)
        .await?;
    posts::Entity::delete_by_id(post.id).exec(&txn).await?;
    txn.commit().await?;

    log::info!("Post deleted: post_id={}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_published_at_set_once() {
        let first = Utc::now().naive_utc();
        let later = first + Duration::hours(1);

        let at = published_at_after(None, PostStatus::Published, first);
        assert_eq!(at, Some(first));
        let at = published_at_after(at, PostStatus::Draft, later);
        assert_eq!(at, Some(first));
        let at = published_at_after(at, PostStatus::Published, later);
        assert_eq!(at, Some(first));
    }

    #[test]
    fn test_draft_has_no_publish_time() {
        let now = Utc::now().naive_utc();
        assert_eq!(published_at_after(None, PostStatus::Draft, now), None);
    }

    #[test]
    fn test_form_keys() {
        let (keys, form) = PostForm::from_json(serde_json::json!({
            "status": "published",
            "tags": "[1, \"2\"]",
            "category": "3"
        }))
        .unwrap();

        assert_eq!(
            keys.into_iter().collect::<Vec<_>>(),
            vec!["category", "status", "tags"]
        );
        assert_eq!(form.tags.map(|t| t.len()), Some(2));
        assert_eq!(form.category.and_then(|c| c.to_id()), Some(3));
        assert!(form.title.is_none());
    }

    #[test]
    fn test_form_rejects_non_object() {
        assert!(matches!(
            PostForm::from_json(serde_json::json!([1, 2])),
            Err(AppError::Validation(_))
        ));
    }
}
