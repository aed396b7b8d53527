#![forbid(unsafe_code)]

//! Refresh contract between the store and the embedding application.
//!
//! A field may carry a [`RefreshFn`]: an asynchronous, caller-supplied
//! function that produces a new option set. The store calls it when the field
//! it depends on changes selection, or when [`crate::FieldStore::refresh_field`]
//! is invoked directly. The store does not retry or cache the result.
//!
//! # Overlapping refreshes
//!
//! Refreshes of one field are serialized as "latest wins". Starting a refresh
//! bumps the field's refresh generation; a refresh that resumes after a newer
//! one started resolves to [`RefreshOutcome::Superseded`] and its options are
//! discarded. The superseded collaborator call is not cancelled, only
//! ignored.

use std::future::Future;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;

use crate::error::{RefreshError, StoreError};
use crate::value::FormValue;

/// Argument handed to a refresh function: the id selected in the parent
/// field, or `None` when the parent selection was cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RefreshParams {
    pub id: Option<String>,
}

impl RefreshParams {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self { id: None }
    }

    /// Build from an optional selection. An empty string counts as absent.
    #[must_use]
    pub fn from_selection(id: Option<&str>) -> Self {
        Self {
            id: id.filter(|s| !s.is_empty()).map(str::to_string),
        }
    }

    /// True when the params identify something to refresh against.
    #[must_use]
    pub fn has_payload(&self) -> bool {
        self.id.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// Shared, boxed refresh function.
pub type RefreshFn =
    Rc<dyn Fn(RefreshParams) -> LocalBoxFuture<'static, Result<Vec<FormValue>, RefreshError>>>;

/// Future returned by [`crate::FieldStore::refresh_field`].
pub type RefreshTask = LocalBoxFuture<'static, Result<RefreshOutcome, StoreError>>;

/// Box an async closure into a [`RefreshFn`].
///
/// ```
/// use formstore::{FormValue, RefreshError, RefreshParams, refresh_fn};
///
/// let refresh = refresh_fn(|params: RefreshParams| async move {
///     let parent = params.id.unwrap_or_default();
///     Ok::<_, RefreshError>(vec![FormValue::simple(format!("{parent}-1"))])
/// });
/// # let _ = refresh;
/// ```
pub fn refresh_fn<F, Fut>(f: F) -> RefreshFn
where
    F: Fn(RefreshParams) -> Fut + 'static,
    Fut: Future<Output = Result<Vec<FormValue>, RefreshError>> + 'static,
{
    Rc::new(move |params| f(params).boxed_local())
}

/// How a refresh ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The option set was replaced.
    Applied { option_count: usize },
    /// The params carried no payload; the refresh function was not called.
    Skipped,
    /// A newer refresh on the same field started while this one was
    /// suspended. The result was discarded.
    Superseded,
    /// The field has no refresh function and the store is configured to
    /// ignore that.
    NotConfigured,
}

impl RefreshOutcome {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}
