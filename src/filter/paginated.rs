use serde::{Deserialize, Serialize};

/// One page of results plus the totals needed to page through the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PaginatedList<T> {
    pub items: Vec<T>,
    pub total_items: i64,
    pub page_size: i32,
    pub current_page: i32,
    pub total_pages: i64,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

impl<T> PaginatedList<T> {
    pub fn new(items: Vec<T>, total_items: i64, current_page: i32, page_size: i32) -> Self {
        let total_pages = if page_size > 0 {
            (total_items + page_size as i64 - 1) / page_size as i64
        } else {
            0
        };
        Self {
            items,
            total_items,
            page_size,
            current_page,
            total_pages,
            has_previous_page: current_page > 1,
            has_next_page: (current_page as i64) < total_pages,
        }
    }

    /// Pages an in-memory sequence.
    pub fn create(source: Vec<T>, current_page: i32, page_size: i32) -> Self {
        let total_items = source.len() as i64;
        let skip = (current_page.max(1) as usize - 1).saturating_mul(page_size.max(0) as usize);
        let items = source.into_iter().skip(skip).take(page_size.max(0) as usize).collect();
        Self::new(items, total_items, current_page, page_size)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedList<U> {
        self.map_items(|items| items.into_iter().map(f).collect())
    }

    /// Replaces the whole page at once, for mappings that need every item.
    pub fn map_items<U>(self, f: impl FnOnce(Vec<T>) -> Vec<U>) -> PaginatedList<U> {
        PaginatedList {
            items: f(self.items),
            total_items: self.total_items,
            page_size: self.page_size,
            current_page: self.current_page,
            total_pages: self.total_pages,
            has_previous_page: self.has_previous_page,
            has_next_page: self.has_next_page,
        }
    }
}
