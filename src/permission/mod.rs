//! Role and ownership based access decisions.
//!
//! Every write route asks [`can_perform`] before touching the store, so the
//! whole policy lives in the match below.


use crate::error::AppError;
use crate::orm::users::{self, Role};
use std::collections::BTreeSet;

/// The only payload key a non-admin owner may submit when updating a post.
pub const OWNER_EDITABLE_FIELD: &str = "status";

/// The authenticated account a decision is made for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor {
    pub id: i32,
    pub role: Role,
}

impl From<&users::Model> for Actor {
    fn from(user: &users::Model) -> Self {
        Self {
            id: user.id,
            role: user.role,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Action<'a> {
    Create,
    List,
    /// Update carrying the set of keys present in the submitted payload.
    Update(&'a BTreeSet<String>),
    Delete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    /// A post. `owner_id` is `None` for a post that does not exist yet.
    Post { owner_id: Option<i32> },
    Category,
    Tag,
    /// Staff accounts managed from the admin views.
    Staff,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl From<bool> for Decision {
    fn from(allowed: bool) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

pub fn can_perform(actor: &Actor, action: &Action, resource: &Resource) -> Decision {
    let is_admin = actor.role.is_admin();

    match (action, resource) {
        (Action::Create | Action::List, Resource::Post { .. } | Resource::Category | Resource::Tag) => {
            Decision::Allow
        }
        (Action::Delete, Resource::Post { .. } | Resource::Category | Resource::Tag) => {
            is_admin.into()
        }
        (Action::Update(fields), Resource::Post { owner_id }) => {
            let is_owner = *owner_id == Some(actor.id);
            (is_admin || (is_owner && is_status_only(fields))).into()
        }
        (Action::Update(_), Resource::Category | Resource::Tag) => Decision::Allow,
        (_, Resource::Staff) => is_admin.into(),
    }
}

/// Same as [`can_perform`], as a `Result` for use with `?`.
pub fn authorize(actor: &Actor, action: &Action, resource: &Resource) -> Result<(), AppError> {
    match can_perform(actor, action, resource) {
        Decision::Allow => Ok(()),
        Decision::Deny => {
            log::debug!(
                "denied {:?} on {:?} for user_id={} role={}",
                action,
                resource,
                actor.id,
                actor.role.as_str()
            );
            Err(AppError::forbidden())
        }
    }
}

fn is_status_only(fields: &BTreeSet<String>) -> bool {
    fields.len() == 1 && fields.contains(OWNER_EDITABLE_FIELD)
}
