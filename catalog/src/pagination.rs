use crate::error::{CatalogError, Result};
use serde::Serialize;
use std::collections::HashMap;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const PAGE_PARAM: &str = "page";

/// One page of a list result. `next` and `previous` are page numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<u64>,
    pub previous: Option<u64>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

/// The page a client asked for, before the total count is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    Number(u64),
    Last,
}

impl PageRequest {
    /// Read `?page=`. Absent or empty means the first page.
    pub fn from_query(params: &HashMap<String, String>) -> Result<Self> {
        let raw = match params.get(PAGE_PARAM).map(|s| s.trim()) {
            None | Some("") => return Ok(PageRequest::Number(1)),
            Some(raw) => raw,
        };
        if raw == "last" {
            return Ok(PageRequest::Last);
        }
        match raw.parse::<u64>() {
            Ok(n) if n >= 1 => Ok(PageRequest::Number(n)),
            _ => Err(CatalogError::InvalidPage),
        }
    }

    /// Pin the request to a concrete page once the total is known.
    /// The first page always exists, even for an empty result.
    pub fn resolve(self, count: u64, size: usize) -> Result<PageWindow> {
        let pages = page_count(count, size);
        let number = match self {
            PageRequest::Number(n) if n <= pages => n,
            PageRequest::Number(_) => return Err(CatalogError::InvalidPage),
            PageRequest::Last => pages,
        };
        Ok(PageWindow {
            number,
            pages,
            size,
            count,
        })
    }
}

/// A concrete, in-range page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub pages: u64,
    pub size: usize,
    pub count: u64,
}

impl PageWindow {
    pub fn offset(&self) -> usize {
        (self.number as usize - 1) * self.size
    }

    pub fn into_page<T>(self, results: Vec<T>) -> Page<T> {
        Page {
            count: self.count,
            next: (self.number < self.pages).then_some(self.number + 1),
            previous: (self.number > 1).then(|| self.number - 1),
            results,
        }
    }
}

fn page_count(count: u64, size: usize) -> u64 {
    let size = size.max(1) as u64;
    count.div_ceil(size).max(1)
}
