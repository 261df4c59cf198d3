use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: u32 = 6;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    /// Newest first.
    #[default]
    Latest,
    /// Most viewed first, then most liked.
    Trending,
}

impl SortBy {
    fn parse(raw: &str) -> SortBy {
        match raw.trim().to_ascii_lowercase().as_str() {
            "trending" => SortBy::Trending,
            _ => SortBy::Latest,
        }
    }
}

/// Raw list query. Values stay strings so that junk falls back to defaults
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
}

impl ListQuery {
    pub fn page(&self) -> Page {
        Page::new(
            positive(self.page.as_deref()).unwrap_or(1),
            positive(self.limit.as_deref()).unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }

    pub fn sort(&self) -> SortBy {
        self.sort_by.as_deref().map(SortBy::parse).unwrap_or_default()
    }
}

fn positive(raw: Option<&str>) -> Option<u32> {
    raw?.trim().parse::<u32>().ok().filter(|n| *n > 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub limit: u32,
}

impl Page {
    pub fn new(number: u32, limit: u32) -> Self {
        Self {
            number: number.max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.number as u64 - 1) * self.limit as u64
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit as u64)
    }

    /// Slices an already ordered list.
    #[cfg(test)]
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(self.offset() as usize)
            .take(self.limit as usize)
            .cloned()
            .collect()
    }
}
