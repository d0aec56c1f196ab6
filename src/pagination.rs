use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// PageRequest
///
/// Zero-based page index plus page size. Negative page numbers are clamped to 0,
/// matching how the listing endpoints have always treated them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, size: i64) -> Self {
        Self {
            page: page.unwrap_or(0).max(0),
            size: size.max(1),
        }
    }

    /// Saturates instead of overflowing, so absurd page numbers simply land past the end.
    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.size)
    }
}

/// Page
///
/// One slice of a listing plus the totals the client needs to render paging controls.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: i64,
    pub size: i64,
    pub total_elements: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: i64) -> Self {
        let total_pages = (total_elements + request.size - 1) / request.size;
        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages,
        }
    }

    pub fn empty(request: PageRequest) -> Self {
        Self::new(Vec::new(), request, 0)
    }

    /// Requesting page 0 of an empty listing is fine; anything past the last page is not.
    pub fn is_past_last_page(&self) -> bool {
        self.page > 0 && self.page >= self.total_pages
    }

    pub fn last_page(&self) -> i64 {
        (self.total_pages - 1).max(0)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}

/// UserSortKey
///
/// Whitelisted sort properties for the admin user listing. The SQL column is taken
/// from this enum, never from the request, so the ORDER BY clause cannot be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserSortKey {
    #[default]
    Id,
    Login,
    Username,
    Admin,
    Banned,
}

impl UserSortKey {
    pub fn column(self) -> &'static str {
        match self {
            UserSortKey::Id => "id",
            UserSortKey::Login => "login",
            UserSortKey::Username => "name",
            UserSortKey::Admin => "is_admin",
            UserSortKey::Banned => "is_banned",
        }
    }
}

/// UserSort
///
/// Parsed form of `sort=property[,asc|desc]`. Unknown properties fall back to `id`
/// and unknown directions to ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserSort {
    pub key: UserSortKey,
    pub descending: bool,
}

impl UserSort {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        let mut parts = raw.split(',').map(str::trim);
        let key = match parts.next().map(str::to_ascii_lowercase).as_deref() {
            Some("login") => UserSortKey::Login,
            Some("username") | Some("name") => UserSortKey::Username,
            Some("admin") => UserSortKey::Admin,
            Some("banned") => UserSortKey::Banned,
            _ => UserSortKey::Id,
        };
        let descending = parts
            .next()
            .is_some_and(|direction| direction.eq_ignore_ascii_case("desc"));
        Self { key, descending }
    }
}
