mod order;
mod paginate;
mod predicate;

pub use order::{sort, SortDirection, SortSpec};
pub use paginate::{next_page, paginate, prev_page, total_pages, Page};
pub use predicate::{filter, Clause, FilterSpec};
