use std::num::NonZeroUsize;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, CatalogError, CreateForm, Product, UpdateForm, ValidationError};
use crate::engine::{SortKey, ViewState};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("product #{id} is not loaded")]
    UnknownProduct { id: i64 },

    #[error("failed to merge update for product #{id}: {source}")]
    Merge {
        id: i64,
        #[source]
        source: serde_json::Error,
    },
}

/// One admin table bound to one catalog.
///
/// Every catalog call takes `&mut self`, so a session never has more than one
/// request outstanding and results are applied in the order they were issued.
#[derive(Debug)]
pub struct Session<C> {
    catalog: C,
    state: ViewState,
    load_failed: bool,
}

impl<C: Catalog> Session<C> {
    pub fn new(catalog: C, page_size: NonZeroUsize) -> Self {
        Self {
            catalog,
            state: ViewState::new(page_size),
            load_failed: false,
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// True when the most recent load failed; the dataset is then whatever
    /// the previous successful load left behind.
    pub fn load_failed(&self) -> bool {
        self.load_failed
    }

    pub async fn load(&mut self) -> Result<usize, SessionError> {
        match self.catalog.list().await {
            Ok(records) => {
                let count = records.len();
                self.state.load(records);
                self.load_failed = false;
                info!(count, "products loaded");
                Ok(count)
            }
            Err(e) => {
                self.load_failed = true;
                warn!(error = %e, "failed to load products");
                Err(e.into())
            }
        }
    }

    pub async fn create(&mut self, form: &CreateForm) -> Result<Product, SessionError> {
        let fields = form.validate().map_err(|e| {
            debug!(error = %e, "create rejected locally");
            e
        })?;
        let created = self.catalog.create(&fields).await.map_err(|e| {
            warn!(error = %e, title = %fields.title, "failed to create product");
            e
        })?;
        info!(id = created.id, title = %created.title, "product created");
        self.state.record_created(created.clone());
        Ok(created)
    }

    pub async fn update(&mut self, id: i64, form: &UpdateForm) -> Result<Product, SessionError> {
        let fields = form.validate().map_err(|e| {
            debug!(error = %e, id, "update rejected locally");
            e
        })?;
        if self.state.find(id).is_none() {
            return Err(SessionError::UnknownProduct { id });
        }
        let patch = self.catalog.update(id, &fields).await.map_err(|e| {
            warn!(error = %e, id, "failed to update product");
            e
        })?;
        let current = self
            .state
            .find(id)
            .ok_or(SessionError::UnknownProduct { id })?;
        let merged = current
            .overlay(patch)
            .map_err(|e| SessionError::Merge { id, source: e })?;
        self.state.record_updated(merged.clone());
        info!(id, title = %merged.title, "product updated");
        Ok(merged)
    }

    /// A pre-filled edit form for a loaded record.
    pub fn edit_form(&self, id: i64) -> Result<UpdateForm, SessionError> {
        self.state
            .find(id)
            .map(UpdateForm::from_product)
            .ok_or(SessionError::UnknownProduct { id })
    }

    pub fn search(&mut self, query: &str) {
        self.state.apply_search(query);
    }

    pub fn sort(&mut self, key: SortKey) {
        self.state.apply_sort(key);
    }

    pub fn set_page_size(&mut self, page_size: NonZeroUsize) {
        self.state.set_page_size(page_size);
    }

    pub fn go_to_page(&mut self, page: usize) -> bool {
        self.state.go_to_page(page)
    }

    pub fn next_page(&mut self) -> bool {
        let next = self.state.current_page() + 1;
        self.state.go_to_page(next)
    }

    pub fn previous_page(&mut self) -> bool {
        let previous = self.state.current_page().saturating_sub(1);
        self.state.go_to_page(previous)
    }
}
