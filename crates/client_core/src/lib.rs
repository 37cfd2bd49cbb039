//! Page-side core of the Pokédex: loading the species listing, deriving the
//! filtered and paginated view, and the interactions that reach the worker.

pub mod browse;
pub mod interaction;
pub mod loader;

pub use browse::{
    filter, paginate, reduce, total_pages, Action, BrowseState, BrowseView, Card, Catalog,
    PaginationBar, Screen, SearchState, PAGE_SIZE,
};
pub use interaction::{species_viewed_message, PermissionHost, Pokedex};
pub use loader::{LoadError, LoaderConfig, SpeciesLoader};
