/// Integration tests for post writes: derivation, validation and tag/image sets

mod common;

use blogsmith::blog::fields::IdRef;
use blogsmith::blog::{self, PostForm};
use blogsmith::error::AppError;
use blogsmith::orm::posts::PostStatus;
use blogsmith::orm::users::Role;
use blogsmith::orm::{post_images, post_tags};
use common::*;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};

struct Setup {
    db: DatabaseConnection,
    author_id: i32,
    category_id: i32,
}

async fn setup() -> Setup {
    let db = setup_test_database().await.expect("Failed to set up database");
    let author = create_test_user(&db, "writer", Role::Publisher)
        .await
        .expect("Failed to create test user");
    let category = create_test_category(&db, "Air Filters", author.id)
        .await
        .expect("Failed to create category");

    Setup {
        db,
        author_id: author.id,
        category_id: category.id,
    }
}

fn form(title: &str, category_id: i32) -> PostForm {
    PostForm {
        title: Some(title.to_owned()),
        author: Some("Jane Doe".to_owned()),
        content: Some("<p>Cleaner air for <b>everyone</b>.</p>".to_owned()),
        category: Some(IdRef::from(category_id)),
        ..Default::default()
    }
}

#[actix_rt::test]
async fn test_create_derives_slug_and_excerpt() {
    let s = setup().await;

    let post = blog::create_post(&s.db, s.author_id, form("New HEPA Filter Launch!", s.category_id))
        .await
        .expect("Post should be created");

    assert_eq!(post.slug.as_deref(), Some("new-hepa-filter-launch"));
    assert_eq!(post.excerpt, "Cleaner air for everyone....");
    assert_eq!(post.status, PostStatus::Draft);
    assert_eq!(post.published_at, None);
    assert_eq!(post.views, 0);
    assert_eq!(post.category.as_ref().map(|c| c.name.as_str()), Some("Air Filters"));
    assert_eq!(post.created_by.as_ref().map(|c| c.id), Some(s.author_id));
}

#[actix_rt::test]
async fn test_create_keeps_supplied_excerpt() {
    let s = setup().await;

    let mut f = form("Hand written", s.category_id);
    f.excerpt = Some("My own summary".to_owned());
    let post = blog::create_post(&s.db, s.author_id, f).await.unwrap();

    assert_eq!(post.excerpt, "My own summary");
}

#[actix_rt::test]
async fn test_create_requires_fields() {
    let s = setup().await;

    let mut f = form("No author", s.category_id);
    f.author = Some("   ".to_owned());
    let err = blog::create_post(&s.db, s.author_id, f).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ref m) if m == "Title, author, content, and category are required"
    ));

    let mut f = form("No category", s.category_id);
    f.category = None;
    assert!(blog::create_post(&s.db, s.author_id, f).await.is_err());
}

#[actix_rt::test]
async fn test_create_checks_references() {
    let s = setup().await;

    let err = blog::create_post(&s.db, s.author_id, form("Orphan", s.category_id + 100))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ref m) if m == "Category does not exist"));

    let tag = create_test_tag(&s.db, "hepa", s.author_id).await.unwrap();
    let mut f = form("Bad tags", s.category_id);
    f.tags = Some(vec![IdRef::from(tag.id), IdRef::from(tag.id + 100)]);
    let err = blog::create_post(&s.db, s.author_id, f).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(ref m) if m == "One or more tags do not exist"));

    let mut f = form("Bad status", s.category_id);
    f.status = Some("archived".to_owned());
    let err = blog::create_post(&s.db, s.author_id, f).await.unwrap_err();
    assert_eq!(err.kind(), "ValidationError");
}

#[actix_rt::test]
async fn test_create_dedupes_tags_and_orders_images() {
    let s = setup().await;
    let a = create_test_tag(&s.db, "alpha", s.author_id).await.unwrap();
    let b = create_test_tag(&s.db, "beta", s.author_id).await.unwrap();

    let mut f = form("Tagged", s.category_id);
    f.tags = Some(vec![
        IdRef::from(b.id),
        IdRef::Text(a.id.to_string()),
        IdRef::from(b.id),
    ]);
    f.images = Some(vec!["/uploads/2.png".to_owned(), "/uploads/1.png".to_owned()]);
    let post = blog::create_post(&s.db, s.author_id, f).await.unwrap();

    let mut names: Vec<&str> = post.tags.iter().map(|t| t.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["alpha", "beta"]);
    assert_eq!(post.images, vec!["/uploads/2.png", "/uploads/1.png"]);
}

#[actix_rt::test]
async fn test_duplicate_slug_conflicts() {
    let s = setup().await;

    blog::create_post(&s.db, s.author_id, form("Same Title", s.category_id))
        .await
        .unwrap();
    let err = blog::create_post(&s.db, s.author_id, form("Same title!", s.category_id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // The failed write left nothing behind.
    assert_eq!(
        blogsmith::orm::posts::Entity::find().count(&s.db).await.unwrap(),
        1
    );
}

#[actix_rt::test]
async fn test_published_at_set_exactly_once() {
    let s = setup().await;

    let mut f = form("Going live", s.category_id);
    f.status = Some("published".to_owned());
    let post = blog::create_post(&s.db, s.author_id, f).await.unwrap();
    let first = post.published_at.expect("Published post has a publish time");

    let status = |status: &str| PostForm {
        status: Some(status.to_owned()),
        ..Default::default()
    };

    let post = blog::update_post(&s.db, post.id, status("draft")).await.unwrap();
    assert_eq!(post.status, PostStatus::Draft);
    assert_eq!(post.published_at, Some(first));

    let post = blog::update_post(&s.db, post.id, status("published")).await.unwrap();
    assert_eq!(post.published_at, Some(first));
}

#[actix_rt::test]
async fn test_update_title_regenerates_slug_only_on_change() {
    let s = setup().await;
    let post = blog::create_post(&s.db, s.author_id, form("First Title", s.category_id))
        .await
        .unwrap();

    let post = blog::update_post(
        &s.db,
        post.id,
        PostForm {
            title: Some("Second Title".to_owned()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(post.slug.as_deref(), Some("second-title"));

    // Author changes leave the slug alone.
    let post = blog::update_post(
        &s.db,
        post.id,
        PostForm {
            author: Some("Someone Else".to_owned()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(post.slug.as_deref(), Some("second-title"));
    assert_eq!(post.author, "Someone Else");
}

#[actix_rt::test]
async fn test_excerpt_never_overwritten() {
    let s = setup().await;
    let post = blog::create_post(&s.db, s.author_id, form("Excerpted", s.category_id))
        .await
        .unwrap();
    let original = post.excerpt.clone();

    let post = blog::update_post(
        &s.db,
        post.id,
        PostForm {
            content: Some("Completely new body".to_owned()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(post.content, "Completely new body");
    assert_eq!(post.excerpt, original);
}

#[actix_rt::test]
async fn test_update_replaces_tags_and_keeps_creator() {
    let s = setup().await;
    let a = create_test_tag(&s.db, "alpha", s.author_id).await.unwrap();
    let b = create_test_tag(&s.db, "beta", s.author_id).await.unwrap();

    let mut f = form("Retag me", s.category_id);
    f.tags = Some(vec![IdRef::from(a.id)]);
    let post = blog::create_post(&s.db, s.author_id, f).await.unwrap();

    let post = blog::update_post(
        &s.db,
        post.id,
        PostForm {
            tags: Some(vec![IdRef::from(b.id)]),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(post.tags.len(), 1);
    assert_eq!(post.tags[0].id, b.id);
    assert_eq!(post.created_by.map(|c| c.id), Some(s.author_id));

    // Absent tags leave the set alone.
    let post = blog::update_post(
        &s.db,
        post.id,
        PostForm {
            featured_image: Some("/uploads/cover.png".to_owned()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(post.tags.len(), 1);
    assert_eq!(post.featured_image, "/uploads/cover.png");
}

#[actix_rt::test]
async fn test_update_missing_post_not_found() {
    let s = setup().await;
    let err = blog::update_post(&s.db, 4242, PostForm::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref m) if m == "Blog not found"));
}

#[actix_rt::test]
async fn test_delete_removes_links() {
    let s = setup().await;
    let tag = create_test_tag(&s.db, "alpha", s.author_id).await.unwrap();

    let mut f = form("Short lived", s.category_id);
    f.tags = Some(vec![IdRef::from(tag.id)]);
    f.images = Some(vec!["/uploads/a.png".to_owned()]);
    let post = blog::create_post(&s.db, s.author_id, f).await.unwrap();

    blog::delete_post(&s.db, post.id).await.unwrap();

    assert!(matches!(
        blog::get_post(&s.db, post.id).await,
        Err(AppError::NotFound(_))
    ));
    assert_eq!(post_tags::Entity::find().count(&s.db).await.unwrap(), 0);
    assert_eq!(post_images::Entity::find().count(&s.db).await.unwrap(), 0);

    assert!(matches!(
        blog::delete_post(&s.db, post.id).await,
        Err(AppError::NotFound(_))
    ));
}
