use serde::{Deserialize, Serialize};

/// Listings are sliced into fixed pages of this many posts.
pub const PAGE_SIZE: u64 = 10;

#[derive(Debug, Deserialize)]
pub struct PageParams {
    // Use serde default. Default for u64 is 0, which we treat as page 1.
    #[serde(default)]
    page: u64,
}

impl PageParams {
    pub fn page(&self) -> u64 {
        self.page.max(1)
    }
}

/// One page of a listing, with enough metadata for clients to render pagers.
#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub total_pages: u64,
    pub total_items: u64,
}

/// Clamps a requested page number into the valid range for `total_items`.
/// Requests past the last page land on the last page rather than returning
/// an empty slice; an empty listing still reports page 1 of 1.
pub fn clamp_page(requested: u64, total_items: u64) -> u64 {
    requested.max(1).min(total_pages(total_items))
}

pub fn total_pages(total_items: u64) -> u64 {
    (total_items.div_ceil(PAGE_SIZE)).max(1)
}

/// Row offset for an (already clamped) page number.
pub fn page_offset(page: u64) -> u64 {
    (page.max(1) - 1) * PAGE_SIZE
}
