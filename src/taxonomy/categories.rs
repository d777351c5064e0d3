use super::TermForm;
use crate::derive;
use crate::error::AppError;
use crate::orm::categories;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

const EXISTS: &str = "Category already exists";

fn not_found() -> AppError {
    AppError::NotFound("Category not found".to_owned())
}

pub async fn list(db: &DatabaseConnection) -> Result<Vec<categories::Model>, AppError> {
    Ok(categories::Entity::find()
        .order_by_asc(categories::Column::Name)
        .all(db)
        .await?)
}

pub async fn create(
    db: &DatabaseConnection,
    created_by: i32,
    form: &TermForm,
) -> Result<categories::Model, AppError> {
    let name = form.required_name("Category")?;

    if categories::Entity::find()
        .filter(categories::Column::Name.eq(name))
        .one(db)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(EXISTS.to_owned()));
    }

    let now = Utc::now().naive_utc();
    let category = categories::ActiveModel {
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

    log::info!("Category created: category_id={} name={}", category.id, category.name);
    Ok(category)
}

pub async fn update(
    db: &DatabaseConnection,
    id: i32,
    form: &TermForm,
) -> Result<categories::Model, AppError> {
    let category = categories::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(not_found)?;

    let mut active: categories::ActiveModel = category.clone().into();
    if let Some(name) = form.name() {
        if name != category.name {
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

/// Posts filed under the category keep its id and render without a category.
pub async fn delete(db: &DatabaseConnection, id: i32) -> Result<(), AppError> {
    let result = categories::Entity::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(not_found());
    }

    log::info!("Category deleted: category_id={}", id);
    Ok(())
}
