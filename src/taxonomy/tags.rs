use super::TermForm;
use crate::derive;
use crate::error::AppError;
use crate::orm::{post_tags, tags};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

const EXISTS: &str = "Tag already exists";

fn not_found() -> AppError {
    AppError::NotFound("Tag not found".to_owned())
}

pub async fn list(db: &DatabaseConnection) -> Result<Vec<tags::Model>, AppError> {
    Ok(tags::Entity::find()
        .order_by_asc(tags::Column::Name)
        .all(db)
        .await?)
}

pub async fn create(
    db: &DatabaseConnection,
    created_by: i32,
    form: &TermForm,
) -> Result<tags::Model, AppError> {
    let name = form.required_name("Tag")?;

    if tags::Entity::find()
        .filter(tags::Column::Name.eq(name))
        .one(db)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(EXISTS.to_owned()));
    }

    let now = Utc::now().naive_utc();
    let tag = tags::ActiveModel {
        name: Set(name.to_owned()),
        slug: Set(derive::derive_slug(name)),
        description: Set(form.description.clone().unwrap_or_default()),
        created_by: Set(created_by),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| AppError::from_write(e, EXISTS))?;

    log::info!("Tag created: tag_id={} name={}", tag.id, tag.name);
    Ok(tag)
}

pub async fn update(
    db: &DatabaseConnection,
    id: i32,
    form: &TermForm,
) -> Result<tags::Model, AppError> {
    let tag = tags::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(not_found)?;

    let mut active: tags::ActiveModel = tag.clone().into();
    if let Some(name) = form.name() {
        if name != tag.name {
            active.name = Set(name.to_owned());
            active.slug = Set(derive::derive_slug(name));
        }
    }
    if let Some(description) = &form.description {
        active.description = Set(description.to_owned());
    }
    active.updated_at = Set(Utc::now().naive_utc());

    active
        .update(db)
        .await
        .map_err(|e| AppError::from_write(e, EXISTS))
}

/// Deletes the tag and unlinks it from every post.
pub async fn delete(db: &DatabaseConnection, id: i32) -> Result<(), AppError> {
    let txn = db.begin().await?;
    post_tags::Entity::delete_many()
        .filter(post_tags::Column::TagId.eq(id))
        .exec(&txn)
        .await?;
    let result = tags::Entity::delete_by_id(id).exec(&txn).await?;
    if result.rows_affected == 0 {
        return Err(not_found());
    }
    txn.commit().await?;

    log::info!("Tag deleted: tag_id={}", id);
    Ok(())
}
