use serde::{Deserialize, Serialize};

use crate::ValidationError;

pub const MAX_PAGE_SIZE: u32 = 100;

/// Query parameters accepted by every list endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageRequest {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// A validated page request. `limit: None` means the whole collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub page: u32,
    pub limit: Option<u32>,
}

impl PageRequest {
    pub fn window(self) -> Result<Window, ValidationError> {
        let page = self.page.unwrap_or(1);
        if page == 0 {
            return Err(ValidationError::new("page", "must be at least 1"));
        }
        if let Some(limit) = self.limit {
            if limit == 0 || limit > MAX_PAGE_SIZE {
                return Err(ValidationError::new(
                    "limit",
                    format!("must be between 1 and {MAX_PAGE_SIZE}"),
                ));
            }
        }
        Ok(Window { page, limit: self.limit })
    }
}

impl Window {
    pub const ALL: Window = Window { page: 1, limit: None };

    /// SQLite `LIMIT` value; -1 is unbounded.
    pub fn sql_limit(&self) -> i64 {
        self.limit.map(i64::from).unwrap_or(-1)
    }

    pub fn sql_offset(&self) -> i64 {
        match self.limit {
            Some(limit) => i64::from(self.page - 1) * i64::from(limit),
            None => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, window: Window, total: i64) -> Self {
        let (limit, pages) = match window.limit {
            Some(limit) => {
                let limit = i64::from(limit);
                (limit, (total + limit - 1) / limit)
            }
            None => (total, if total == 0 { 0 } else { 1 }),
        };
        Self {
            data,
            pagination: Pagination { page: window.page, limit, total, pages },
        }
    }
}
