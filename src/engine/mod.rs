//! Client-side view state for the product table.
//!
//! [`ViewState`] owns the loaded records (the dataset), the filtered and sorted
//! projection of them that the table shows (the view), the single active sort,
//! and the pagination window. Every operation is a synchronous, total
//! transformation of that state.

pub mod pagination;

use std::cmp::Ordering;
use std::num::NonZeroUsize;

use crate::catalog::Product;

pub use pagination::{page_links, PageLink};

pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(n) => n,
    None => unreachable!(),
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SortKey {
    Title,
    Price,
}

impl SortKey {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "title" | "name" => Some(Self::Title),
            "price" => Some(Self::Price),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Price => "price",
        }
    }

    fn compare(self, a: &Product, b: &Product) -> Ordering {
        match self {
            Self::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            Self::Price => a.price.total_cmp(&b.price),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Clone, Debug)]
pub struct ViewState {
    dataset: Vec<Product>,
    // positions into `dataset`, in display order
    view: Vec<usize>,
    query: String,
    sort: Option<(SortKey, SortDirection)>,
    current_page: usize,
    page_size: NonZeroUsize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl ViewState {
    pub fn new(page_size: NonZeroUsize) -> Self {
        Self {
            dataset: Vec::new(),
            view: Vec::new(),
            query: String::new(),
            sort: None,
            current_page: 1,
            page_size,
        }
    }

    /// Replaces the dataset and returns search, sort and page to neutral.
    pub fn load(&mut self, records: Vec<Product>) {
        self.dataset = records;
        self.query.clear();
        self.sort = None;
        self.show_everything();
    }

    /// Filters the dataset by case-insensitive title substring, keeping
    /// dataset order. The remembered sort is kept but not re-applied.
    pub fn apply_search(&mut self, query: &str) {
        self.query = query.to_string();
        let needle = query.to_lowercase();
        self.view = self
            .dataset
            .iter()
            .enumerate()
            .filter(|(_, p)| p.title.to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .collect();
        self.current_page = 1;
    }

    /// Ascending on first use of `key`, then alternates. Activating one key
    /// clears the other. Sorts the current view in place; ties keep their
    /// relative order.
    pub fn apply_sort(&mut self, key: SortKey) {
        let direction = match self.sort {
            Some((active, SortDirection::Ascending)) if active == key => SortDirection::Descending,
            _ => SortDirection::Ascending,
        };
        self.sort = Some((key, direction));

        let dataset = &self.dataset;
        self.view.sort_by(|&a, &b| {
            let ordering = key.compare(&dataset[a], &dataset[b]);
            match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
        self.current_page = 1;
    }

    pub fn set_page_size(&mut self, page_size: NonZeroUsize) {
        self.page_size = page_size;
        self.current_page = 1;
    }

    /// Moves to `page` when it exists; out-of-range requests are ignored.
    pub fn go_to_page(&mut self, page: usize) -> bool {
        if page < 1 || page > self.total_pages() {
            return false;
        }
        self.current_page = page;
        true
    }

    pub fn visible_slice(&self) -> Vec<&Product> {
        let size = self.page_size.get();
        let start = (self.current_page - 1).saturating_mul(size);
        self.view
            .iter()
            .skip(start)
            .take(size)
            .map(|&i| &self.dataset[i])
            .collect()
    }

    pub fn total_pages(&self) -> usize {
        self.view.len().div_ceil(self.page_size.get()).max(1)
    }

    pub fn page_links(&self) -> Vec<PageLink> {
        page_links(self.current_page, self.total_pages())
    }

    /// A fresh record goes to the front; the search is cleared and the whole
    /// dataset is shown from page 1 (unsorted, the sort indicator stays).
    pub fn record_created(&mut self, record: Product) {
        self.dataset.insert(0, record);
        self.query.clear();
        self.show_everything();
    }

    /// Swaps in the new version of a known record. The view keeps its order
    /// and membership, even if the new title no longer matches the search.
    pub fn record_updated(&mut self, record: Product) -> bool {
        match self.dataset.iter_mut().find(|p| p.id == record.id) {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        }
    }

    pub fn find(&self, id: i64) -> Option<&Product> {
        self.dataset.iter().find(|p| p.id == id)
    }

    pub fn dataset(&self) -> &[Product] {
        &self.dataset
    }

    pub fn view(&self) -> impl Iterator<Item = &Product> + '_ {
        self.view.iter().map(|&i| &self.dataset[i])
    }

    pub fn view_len(&self) -> usize {
        self.view.len()
    }

    pub fn search_query(&self) -> &str {
        &self.query
    }

    pub fn sort_state(&self) -> Option<(SortKey, SortDirection)> {
        self.sort
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> NonZeroUsize {
        self.page_size
    }

    fn show_everything(&mut self) {
        self.view = (0..self.dataset.len()).collect();
        self.current_page = 1;
    }
}
