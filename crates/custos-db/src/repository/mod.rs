//! In-memory repository implementations.

mod account;
mod credential;
mod group;
mod permission;
mod role;
mod token;
mod user;

pub use account::MemAccountRepository;
pub use credential::MemCredentialRepository;
pub use group::MemGroupRepository;
pub use permission::MemPermissionRepository;
pub use role::MemRoleRepository;
pub use token::MemTokenRepository;
pub use user::MemUserRepository;

use chrono::{DateTime, Utc};
use custos_core::models::{
    account::Account, group::Group, permission::Permission, role::Role, user::User,
};
use custos_core::repository::{ListQuery, PaginatedResult, SortOrder};
use uuid::Uuid;

use crate::store::StoreConfig;

/// Anything that can be filtered and sorted by a list query.
pub(crate) trait Listable: Clone {
    fn id(&self) -> Uuid;
    fn name(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
}

macro_rules! listable {
    ($ty:ty, $name:ident) => {
        impl Listable for $ty {
            fn id(&self) -> Uuid {
                self.id
            }
            fn name(&self) -> &str {
                &self.$name
            }
            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }
        }
    };
}

listable!(Account, name);
listable!(User, username);
listable!(Group, name);
listable!(Role, name);
listable!(Permission, name);

/// Sorts by name, with id as tie-breaker so pages are stable.
pub(crate) fn sorted<T: Listable>(mut items: Vec<T>) -> Vec<T> {
    items.sort_by(|a, b| a.name().cmp(b.name()).then(a.id().cmp(&b.id())));
    items
}

/// Applies filter, order and page bounds of `query` to `items`.
pub(crate) fn paginate<T: Listable>(
    items: impl IntoIterator<Item = T>,
    query: &ListQuery,
    config: &StoreConfig,
) -> PaginatedResult<T> {
    let needle = query.filter.as_deref().map(str::to_lowercase);
    let mut items: Vec<T> = items
        .into_iter()
        .filter(|item| {
            needle
                .as_deref()
                .is_none_or(|n| item.name().to_lowercase().contains(n))
        })
        .collect();

    match query.order {
        SortOrder::NameAsc => {
            items.sort_by(|a, b| a.name().cmp(b.name()).then(a.id().cmp(&b.id())))
        }
        SortOrder::NameDesc => {
            items.sort_by(|a, b| b.name().cmp(a.name()).then(a.id().cmp(&b.id())))
        }
        SortOrder::CreatedAsc => items.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then(a.id().cmp(&b.id()))
        }),
        SortOrder::CreatedDesc => items.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then(a.id().cmp(&b.id()))
        }),
    }

    let limit = match query.pagination.limit {
        0 => config.default_page_size,
        n => n.min(config.max_page_size),
    };
    let offset = query.pagination.offset;
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect();

    PaginatedResult {
        items,
        total,
        offset,
        limit,
    }
}
