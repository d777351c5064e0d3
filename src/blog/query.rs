//! Filtered, paginated post listing and the read-time join that resolves
//! category, tag and creator references.

use crate::error::AppError;
use crate::orm::users::Role;
use crate::orm::{categories, post_images, post_tags, posts, tags, users};
use chrono::NaiveDateTime;
use sea_orm::sea_query::{Expr, Func, LikeExpr, Query};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

/// Raw query string of the listing route. Everything stays a string so that
/// no input can fail extraction; see [`ListParams::from_pairs`].
#[derive(Debug, Default)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

impl ListParams {
    /// Builds the parameters from raw query pairs. A repeated key keeps its
    /// first value and unknown keys are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "page" => &mut params.page,
                "limit" => &mut params.limit,
                "status" => &mut params.status,
                "category" => &mut params.category,
                "tag" => &mut params.tag,
                "search" => &mut params.search,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number.
    pub number: u64,
    pub size: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: DEFAULT_PAGE,
            size: DEFAULT_LIMIT,
        }
    }
}

impl Page {
    /// Reads `page` and `limit` the permissive way: leading digits are used,
    /// anything else (absent, non-numeric, zero, negative) gets the default.
    pub fn coerce(page: Option<&str>, limit: Option<&str>) -> Self {
        Self {
            number: leading_int(page).unwrap_or(DEFAULT_PAGE),
            size: leading_int(limit).unwrap_or(DEFAULT_LIMIT),
        }
    }

    /// 0-based index as used by the paginator.
    fn index(&self) -> u64 {
        self.number - 1
    }
}

/// Parses an optional sign followed by digits at the start of `raw`, ignoring
/// any trailing text. Returns `None` unless the result is positive.
fn leading_int(raw: Option<&str>) -> Option<u64> {
    let raw = raw?.trim_start();
    let (negative, digits) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let digits = &digits[..end];
    if digits.is_empty() || negative {
        return None;
    }

    // Saturate overlong input instead of rejecting it.
    let value = digits.parse::<u64>().unwrap_or(u64::MAX);
    match value.min(u32::MAX as u64) {
        0 => None,
        v => Some(v),
    }
}

/// Post filters. Every field is optional and active ones are AND-ed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub status: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

impl PostFilter {
    pub fn from_params(params: &ListParams) -> Self {
        let present = |v: &Option<String>| v.as_ref().filter(|s| !s.is_empty()).cloned();
        Self {
            status: present(&params.status),
            category: present(&params.category),
            tag: present(&params.tag),
            search: present(&params.search),
        }
    }

    pub fn condition(&self) -> Condition {
        let mut cond = Condition::all();

        if let Some(status) = &self.status {
            cond = cond.add(posts::Column::Status.eq(status.as_str()));
        }

        if let Some(category) = &self.category {
            cond = cond.add(match category.trim().parse::<i32>() {
                Ok(id) => posts::Column::CategoryId.eq(id),
                Err(_) => match_nothing(),
            });
        }

        if let Some(tag) = &self.tag {
            cond = cond.add(match tag.trim().parse::<i32>() {
                Ok(id) => posts::Column::Id.in_subquery(
                    Query::select()
                        .column(post_tags::Column::PostId)
                        .from(post_tags::Entity)
                        .and_where(post_tags::Column::TagId.eq(id))
                        .to_owned(),
                ),
                Err(_) => match_nothing(),
            });
        }

        if let Some(search) = &self.search {
            cond = cond.add(search_condition(search));
        }

        cond
    }
}

/// Substring match over title, content and excerpt.
///
/// Both sides are lower-cased, which folds Unicode on Postgres but only ASCII
/// on SQLite. The column is also matched as stored, so a search in the
/// text's own casing always hits on either backend.
fn search_condition(search: &str) -> Condition {
    let folded = format!("%{}%", escape_like(&search.to_lowercase()));
    let verbatim = format!("%{}%", escape_like(search));

    let mut any = Condition::any();
    for col in [
        posts::Column::Title,
        posts::Column::Content,
        posts::Column::Excerpt,
    ] {
        any = any
            .add(
                Expr::expr(Func::lower(Expr::col(col)))
                    .like(LikeExpr::new(folded.clone()).escape(LIKE_ESCAPE)),
            )
            .add(Expr::col(col).like(LikeExpr::new(verbatim.clone()).escape(LIKE_ESCAPE)));
    }
    any
}

/// A reference that can never be satisfied, e.g. a non-numeric category id.
fn match_nothing() -> sea_orm::sea_query::SimpleExpr {
    posts::Column::Id.is_in(Vec::<i32>::new())
}

/// Escape character for LIKE patterns.
const LIKE_ESCAPE: char = '!';

/// Escapes LIKE metacharacters so `search` is matched literally.
fn escape_like(search: &str) -> String {
    let mut out = String::with_capacity(search.len());
    for c in search.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TermRef {
    pub id: i32,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorRef {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

/// A post with its references resolved for display.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub content: String,
    pub excerpt: String,
    /// `None` when the category has been deleted since.
    pub category: Option<TermRef>,
    pub tags: Vec<TermRef>,
    pub featured_image: String,
    pub images: Vec<String>,
    pub status: posts::PostStatus,
    pub slug: Option<String>,
    pub views: i32,
    pub created_by: Option<CreatorRef>,
    pub published_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current: u64,
    pub pages: u64,
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct PostPage {
    #[serde(rename = "blogs")]
    pub items: Vec<PostView>,
    pub pagination: Pagination,
}

/// Lists posts matching `filter`, newest first.
pub async fn list_posts<C: ConnectionTrait>(
    db: &C,
    filter: &PostFilter,
    page: Page,
) -> Result<PostPage, AppError> {
    let paginator = posts::Entity::find()
        .filter(filter.condition())
        .order_by_desc(posts::Column::CreatedAt)
        .order_by_desc(posts::Column::Id)
        .paginate(db, page.size);

    let total = paginator.num_items().await?;
    // Past the last page nothing is fetched, so the offset never has to fit
    // the store's integer type.
    let models = match page.index().checked_mul(page.size) {
        Some(offset) if offset < total => paginator.fetch_page(page.index()).await?,
        _ => Vec::new(),
    };
    let items = join_related(db, models).await?;

    Ok(PostPage {
        items,
        pagination: Pagination {
            current: page.number,
            pages: total.div_ceil(page.size),
            total,
        },
    })
}

pub async fn get_post<C: ConnectionTrait>(db: &C, id: i32) -> Result<PostView, AppError> {
    let post = posts::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Blog not found".to_owned()))?;

    let mut views = join_related(db, vec![post]).await?;
    views
        .pop()
        .ok_or_else(|| AppError::NotFound("Blog not found".to_owned()))
}

/// Resolves references for a batch of posts with one query per related table.
pub async fn join_related<C: ConnectionTrait>(
    db: &C,
    models: Vec<posts::Model>,
) -> Result<Vec<PostView>, AppError> {
    if models.is_empty() {
        return Ok(Vec::new());
    }

    let post_ids: Vec<i32> = models.iter().map(|p| p.id).collect();
    let category_ids: HashSet<i32> = models.iter().map(|p| p.category_id).collect();
    let creator_ids: HashSet<i32> = models.iter().map(|p| p.created_by).collect();

    let categories: HashMap<i32, TermRef> = categories::Entity::find()
        .filter(categories::Column::Id.is_in(category_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, TermRef { id: c.id, name: c.name }))
        .collect();

    let creators: HashMap<i32, CreatorRef> = users::Entity::find()
        .filter(users::Column::Id.is_in(creator_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| {
            (
                u.id,
                CreatorRef {
                    id: u.id,
                    first_name: u.first_name,
                    last_name: u.last_name,
                    role: u.role,
                },
            )
        })
        .collect();

    let links = post_tags::Entity::find()
        .filter(post_tags::Column::PostId.is_in(post_ids.clone()))
        .order_by_asc(post_tags::Column::Id)
        .all(db)
        .await?;
    let tag_ids: HashSet<i32> = links.iter().map(|l| l.tag_id).collect();
    let tag_names: HashMap<i32, String> = tags::Entity::find()
        .filter(tags::Column::Id.is_in(tag_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|t| (t.id, t.name))
        .collect();

    let mut tags_by_post: HashMap<i32, Vec<TermRef>> = HashMap::new();
    for link in links {
        if let Some(name) = tag_names.get(&link.tag_id) {
            tags_by_post.entry(link.post_id).or_default().push(TermRef {
                id: link.tag_id,
                name: name.to_owned(),
            });
        }
    }

    let mut images_by_post: HashMap<i32, Vec<String>> = HashMap::new();
    for image in post_images::Entity::find()
        .filter(post_images::Column::PostId.is_in(post_ids))
        .order_by_asc(post_images::Column::Position)
        .all(db)
        .await?
    {
        images_by_post.entry(image.post_id).or_default().push(image.url);
    }

    Ok(models
        .into_iter()
        .map(|post| PostView {
            category: categories.get(&post.category_id).cloned(),
            tags: tags_by_post.remove(&post.id).unwrap_or_default(),
            images: images_by_post.remove(&post.id).unwrap_or_default(),
            created_by: creators.get(&post.created_by).cloned(),
            id: post.id,
            title: post.title,
            author: post.author,
            content: post.content,
            excerpt: post.excerpt,
            featured_image: post.featured_image,
            status: post.status,
            slug: post.slug,
            views: post.views,
            published_at: post.published_at,
            created_at: post.created_at,
            updated_at: post.updated_at,
        })
        .collect())
}
