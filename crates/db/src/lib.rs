//! Document store for the book review service.
//!
//! The store is modelled as a set of collection traits so that the HTTP
//! layer and the rating aggregator receive their persistence explicitly.
//! [`MongoStore`] persists to MongoDB; [`MemoryStore`] is the in-process
//! implementation used by tests and by servers started without a database.

pub mod error;
pub mod memory;
pub mod models;
pub mod mongo;
pub mod query;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use models::*;
pub use mongo::MongoStore;
pub use query::{BookQuery, BookSort, BookSortField, Page, PageRequest, SortDirection};
pub use store::{BookStore, RatingStore, ReviewStore, Store, UserStore};
