//! Page-number pagination over counted result sets.

use crate::error::{AppError, Result};
use serde::Serialize;

/// Birds per page on `/birds_nest/`.
pub const LISTING_PAGE_SIZE: i64 = 9;
/// Birds per page on `/search/`.
pub const SEARCH_PAGE_SIZE: i64 = 10;

/// A 1-based page the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    Number(i64),
    Last,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::Number(1)
    }
}

impl PageRequest {
    /// Absent means the first page; anything that is neither a positive
    /// integer nor `last` is a missing page.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some("last") => Ok(Self::Last),
            Some(value) => value
                .parse::<i64>()
                .ok()
                .filter(|n| *n >= 1)
                .map(Self::Number)
                .ok_or_else(|| AppError::not_found("Page", value)),
        }
    }

    /// Resolves against a total; pages past the end do not exist, but an
    /// empty first page does.
    pub fn resolve(self, total: i64, page_size: i64) -> Result<i64> {
        let pages = num_pages(total, page_size);
        let number = match self {
            Self::Number(n) => n,
            Self::Last => pages,
        };
        if number > pages {
            return Err(AppError::not_found("Page", number));
        }
        Ok(number)
    }
}

fn num_pages(total: i64, page_size: i64) -> i64 {
    if total <= 0 {
        1
    } else {
        (total + page_size - 1) / page_size
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: i64,
    pub page_size: i64,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn offset(number: i64, page_size: i64) -> i64 {
        (number - 1) * page_size
    }

    pub fn num_pages(&self) -> i64 {
        num_pages(self.total, self.page_size)
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_page_number(&self) -> i64 {
        self.number + 1
    }

    pub fn previous_page_number(&self) -> i64 {
        self.number - 1
    }

    pub fn is_paginated(&self) -> bool {
        self.num_pages() > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            page_size: self.page_size,
            total: self.total,
        }
    }
}
