//! Pagination window math, shared by every listing and search path.

use serde::Serialize;

use crate::errors::ValidationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    /// 1-based page number implied by the offset.
    pub page: usize,
    pub total_pages: usize,
    pub has_more: bool,
    pub next_offset: Option<usize>,
    pub prev_offset: usize,
}

#[derive(Clone, Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub info: PageInfo,
}

impl<T> Page<T> {
    /// Slice one window out of a fully filtered and sorted result set.
    pub fn slice(all: Vec<T>, limit: usize, offset: usize) -> Result<Self, ValidationError> {
        let info = pagination_info(all.len(), limit, offset)?;
        let items = all.into_iter().skip(offset).take(limit).collect();
        Ok(Page { items, info })
    }
}

pub fn pagination_info(
    total: usize,
    limit: usize,
    offset: usize,
) -> Result<PageInfo, ValidationError> {
    if limit == 0 {
        return Err(ValidationError::ZeroLimit);
    }
    let has_more = offset + limit < total;
    Ok(PageInfo {
        total,
        limit,
        offset,
        page: offset / limit + 1,
        total_pages: total.div_ceil(limit),
        has_more,
        next_offset: has_more.then_some(offset + limit),
        prev_offset: offset.saturating_sub(limit),
    })
}
