use serde::Serialize;

/// Limit used by legacy callers that expect an unpaginated array. Applied
/// at the handler boundary, never inside a store.
pub const COMPAT_LIMIT: i64 = 1000;

const MAX_LIMIT: i64 = 100;

/// Clamped page/limit pair shared by every list operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: i64,
    pub limit: i64,
}

impl PageParams {
    /// Clamp page to >= 1 and limit to [1, 100]. Absent values take the
    /// defaults (page 1, limit 10).
    pub fn clamp(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(10).clamp(1, MAX_LIMIT),
        }
    }

    /// Compat-mode params: one big first page.
    pub fn compat() -> Self {
        Self {
            page: 1,
            limit: COMPAT_LIMIT,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

/// List envelope returned by paginated endpoints. `total`/`total_pages`
/// describe the filtered set, not the page slice.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, total: i64, params: PageParams) -> Self {
        Self {
            data,
            total,
            page: params.page,
            limit: params.limit,
            total_pages: total_pages(total, params.limit),
        }
    }
}

pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}
