#![forbid(unsafe_code)]

//! Reactive form-field store.
//!
//! A [`FieldStore`] holds form fields keyed by id. Fields are either
//! option-based (a dropdown: an option set plus an optional selection) or
//! free-text. A field may name a dependent field; selecting a value in the
//! parent starts an asynchronous refresh of the dependent's options through a
//! caller-supplied [`RefreshFn`].
//!
//! - [`FieldStore::ordered_field_ids`] derives the display order.
//! - [`FieldStore::set_selection`] commits a value and propagates it.
//! - [`FieldStore::refresh_field`] runs the refresh protocol directly.
//! - [`FieldStore::subscribe`] observes every committed change.
//!
//! # Example
//!
//! ```
//! use futures::executor::LocalPool;
//! use formstore::{FieldStore, FormFieldSeed, FormValue, RefreshError, refresh_fn};
//!
//! let mut pool = LocalPool::new();
//! let store = FieldStore::new(pool.spawner());
//!
//! let subcategories = refresh_fn(|params: formstore::RefreshParams| async move {
//!     let parent = params.id.unwrap_or_default();
//!     Ok::<_, RefreshError>(vec![FormValue::simple(format!("{parent}/a"))])
//! });
//!
//! store
//!     .initialize([
//!         FormFieldSeed::new("category", "Category")
//!             .options([FormValue::simple("books"), FormValue::simple("games")])
//!             .dependent("subcategory"),
//!         FormFieldSeed::new("subcategory", "Subcategory").refresh(subcategories),
//!     ])
//!     .unwrap();
//!
//! store.set_selection("category", Some("books")).unwrap();
//! assert!(store.field("subcategory").unwrap().is_disabled());
//!
//! pool.run_until_stalled();
//! let sub = store.field("subcategory").unwrap();
//! assert!(!sub.is_disabled());
//! assert_eq!(sub.options()[0].id(), "books/a");
//! ```

pub mod config;
pub mod error;
pub mod field;
pub mod observer;
pub mod ordering;
pub mod refresh;
pub mod store;
pub mod value;

pub use config::{EmptyPayloadPolicy, MissingRefreshPolicy, StoreConfig};
pub use error::{RefreshError, Result, StoreError};
pub use field::{FieldContent, FieldSnapshot, FormField, FormFieldSeed};
pub use observer::{ChangeOrigin, SelectionChange, StoreEvent, Subscription};
pub use refresh::{RefreshFn, RefreshOutcome, RefreshParams, RefreshTask, refresh_fn};
pub use store::FieldStore;
pub use value::FormValue;
