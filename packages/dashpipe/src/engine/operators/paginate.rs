use serde::Serialize;
use std::num::NonZeroUsize;

/// One page of a derived view. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total_rows: usize,
}

/// `max(1, ceil(len / page_size))`. An empty view still has one (empty) page.
#[inline]
pub fn total_pages(len: usize, page_size: NonZeroUsize) -> usize {
    len.div_ceil(page_size.get()).max(1)
}

/// Slice out page `page`. Out-of-range pages (including 0) yield no rows;
/// the requested page number is reported back unchanged.
pub fn paginate<T: Clone>(items: &[T], page_size: NonZeroUsize, page: usize) -> Page<T> {
    let size = page_size.get();
    let rows = match page.checked_sub(1) {
        Some(idx) => items
            .iter()
            .skip(idx.saturating_mul(size))
            .take(size)
            .cloned()
            .collect(),
        None => Vec::new(),
    };

    Page {
        rows,
        page,
        total_pages: total_pages(items.len(), page_size),
        total_rows: items.len(),
    }
}

/// Advance one page, never past the last.
pub fn next_page(current: usize, total_pages: usize) -> usize {
    if current < total_pages {
        current + 1
    } else {
        current
    }
}

/// Go back one page, never below 1.
pub fn prev_page(current: usize) -> usize {
    if current > 1 {
        current - 1
    } else {
        current
    }
}
