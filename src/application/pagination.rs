//! Page-number pagination over ordered feeds.
//!
//! Page numbers are 1-indexed. A missing or non-numeric `page` parameter
//! resolves to the first page; a number outside `1..=num_pages` resolves to
//! the last page. An empty sequence still has one (empty) page.

use std::num::{IntErrorKind, NonZeroU32};

/// Slice of an ordered sequence requested from a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    total: u64,
    per_page: u64,
}

impl Paginator {
    pub fn new(total: u64, per_page: NonZeroU32) -> Self {
        Self {
            total,
            per_page: u64::from(per_page.get()),
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn num_pages(&self) -> u64 {
        if self.total == 0 {
            1
        } else {
            self.total.div_ceil(self.per_page)
        }
    }

    /// Resolve a raw `page` query value to a valid page number.
    pub fn resolve(&self, raw: Option<&str>) -> u64 {
        let Some(value) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
            return 1;
        };

        match value.parse::<i64>() {
            Ok(number) if number >= 1 && (number as u64) <= self.num_pages() => number as u64,
            Ok(_) => self.num_pages(),
            Err(err) => match err.kind() {
                IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => self.num_pages(),
                _ => 1,
            },
        }
    }

    pub fn window(&self, number: u64) -> PageWindow {
        let number = number.clamp(1, self.num_pages());
        PageWindow {
            offset: (number - 1) * self.per_page,
            limit: self.per_page,
        }
    }

    pub fn page<T>(&self, number: u64, items: Vec<T>) -> Page<T> {
        Page {
            items,
            number: number.clamp(1, self.num_pages()),
            num_pages: self.num_pages(),
            total: self.total,
        }
    }
}

/// One page of results plus the navigation facts templates need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn previous_number(&self) -> Option<u64> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn next_number(&self) -> Option<u64> {
        self.has_next().then(|| self.number + 1)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            total: self.total,
        }
    }
}
