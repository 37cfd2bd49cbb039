//! Filter/paginate view-model.
//!
//! Everything here is a pure function of the loaded collection and the
//! search state. The filtered view is recomputed only when a collection or
//! search-term change is reduced into a new [`BrowseState`].

use std::sync::Arc;

use shared::domain::{Species, SpeciesCollection, SpeciesId};

pub const PAGE_SIZE: usize = 20;

/// Species whose name contains `term`, ignoring case, in collection order.
pub fn filter<'a>(collection: &'a [Species], term: &str) -> Vec<&'a Species> {
    filter_indices(collection, term)
        .into_iter()
        .map(|i| &collection[i])
        .collect()
}

fn filter_indices(collection: &[Species], term: &str) -> Vec<usize> {
    let needle = term.to_lowercase();
    collection
        .iter()
        .enumerate()
        .filter(|(_, species)| species.name.to_lowercase().contains(&needle))
        .map(|(i, _)| i)
        .collect()
}

/// The `page`-th window of `view` (1-based). A start past the end yields an
/// empty window.
pub fn paginate<T>(view: &[T], page: usize, page_size: usize) -> &[T] {
    let start = page.saturating_sub(1).saturating_mul(page_size);
    if page == 0 || start >= view.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(view.len());
    &view[start..end]
}

pub fn total_pages(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchState {
    pub term: String,
    pub page: usize,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            term: String::new(),
            page: 1,
        }
    }
}

/// A loaded collection together with the search applied to it.
#[derive(Debug, Clone)]
pub struct Catalog {
    collection: SpeciesCollection,
    search: SearchState,
    filtered: Arc<[usize]>,
}

impl Catalog {
    pub fn new(collection: SpeciesCollection) -> Self {
        let filtered = (0..collection.len()).collect();
        Self {
            collection,
            search: SearchState::default(),
            filtered,
        }
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.filtered.len(), PAGE_SIZE)
    }

    pub fn page_window(&self) -> Vec<&Species> {
        paginate(&self.filtered[..], self.search.page, PAGE_SIZE)
            .iter()
            .map(|&i| &self.collection[i])
            .collect()
    }

    fn last_page(&self) -> usize {
        self.total_pages().max(1)
    }

    fn with_term(&self, term: String) -> Self {
        let filtered = if term == self.search.term {
            self.filtered.clone()
        } else {
            filter_indices(&self.collection, &term).into()
        };
        Self {
            collection: self.collection.clone(),
            search: SearchState { term, page: 1 },
            filtered,
        }
    }

    fn with_page(&self, page: usize) -> Self {
        Self {
            collection: self.collection.clone(),
            search: SearchState {
                term: self.search.term.clone(),
                page: page.clamp(1, self.last_page()),
            },
            filtered: self.filtered.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum BrowseState {
    #[default]
    Loading,
    Failed {
        message: String,
    },
    Ready(Catalog),
}

#[derive(Debug, Clone)]
pub enum Action {
    Reload,
    Loaded(SpeciesCollection),
    LoadFailed(String),
    SearchChanged(String),
    NextPage,
    PreviousPage,
}

/// Produces the next state; `state` itself is never modified.
pub fn reduce(state: &BrowseState, action: Action) -> BrowseState {
    match (state, action) {
        (_, Action::Reload) => BrowseState::Loading,
        (_, Action::Loaded(collection)) => BrowseState::Ready(Catalog::new(collection)),
        (_, Action::LoadFailed(message)) => BrowseState::Failed { message },
        (BrowseState::Ready(catalog), Action::SearchChanged(term)) => {
            BrowseState::Ready(catalog.with_term(term))
        }
        (BrowseState::Ready(catalog), Action::NextPage) => {
            BrowseState::Ready(catalog.with_page(catalog.search.page.saturating_add(1)))
        }
        (BrowseState::Ready(catalog), Action::PreviousPage) => {
            BrowseState::Ready(catalog.with_page(catalog.search.page.saturating_sub(1)))
        }
        (state, _) => state.clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    /// 1-based position on the current page.
    pub slot: usize,
    pub id: SpeciesId,
    pub name: String,
    pub image_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationBar {
    pub page: usize,
    pub total_pages: usize,
    pub can_go_back: bool,
    pub can_go_forward: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseView {
    pub term: String,
    pub cards: Vec<Card>,
    /// Only present when the results span more than one page.
    pub pagination: Option<PaginationBar>,
    pub no_results: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Loading,
    Error(String),
    Browse(BrowseView),
}

impl BrowseState {
    pub fn screen(&self) -> Screen {
        match self {
            BrowseState::Loading => Screen::Loading,
            BrowseState::Failed { message } => Screen::Error(message.clone()),
            BrowseState::Ready(catalog) => Screen::Browse(catalog.view()),
        }
    }
}

impl Catalog {
    fn view(&self) -> BrowseView {
        let cards = self
            .page_window()
            .into_iter()
            .enumerate()
            .map(|(i, species)| Card {
                slot: i + 1,
                id: species.id,
                name: species.name.clone(),
                image_url: species.image_url.clone(),
            })
            .collect();

        let pagination = (self.filtered_len() > PAGE_SIZE).then(|| PaginationBar {
            page: self.search.page,
            total_pages: self.total_pages(),
            can_go_back: self.search.page > 1,
            can_go_forward: self.search.page < self.total_pages(),
        });

        BrowseView {
            term: self.search.term.clone(),
            cards,
            pagination,
            no_results: self.filtered.is_empty(),
        }
    }
}

#[cfg(test)]
#[path = "tests/browse_tests.rs"]
mod tests;
