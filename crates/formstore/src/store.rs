#![forbid(unsafe_code)]

//! The reactive field store.
//!
//! [`FieldStore`] owns the mapping of field id to [`FormField`], derives the
//! display ordering on demand, and runs the selection and refresh protocol.
//!
//! # Architecture
//!
//! The store is a cheap, cloneable handle over `Rc` shared state, in the same
//! single-threaded style as the rest of the reactive layer. Mutations happen
//! inside short `RefCell` borrows that never span an `.await` or an observer
//! callback. Asynchronous work is handed to a [`LocalSpawn`] executor.
//!
//! # Refresh protocol
//!
//! 1. Bump the field's refresh generation and mark it disabled.
//! 2. Clear its selection without propagating further downstream.
//! 3. Without a payload, stop (policy from [`EmptyPayloadPolicy`]).
//! 4. Await the refresh function. This is the only suspension point.
//! 5. If still the latest refresh, replace the options and re-enable.
//!
//! Steps 1-3 run synchronously inside [`FieldStore::refresh_field`]; steps 4-5
//! run in the returned [`RefreshTask`]. An in-flight guard re-enables the
//! field on every exit path, including failure and the task being dropped.
//!
//! # Failure Modes
//!
//! - **Unknown field**: [`StoreError::Lookup`], nothing mutated.
//! - **Unknown option**: [`StoreError::Reference`], selection unchanged.
//! - **No refresh function**: [`StoreError::Configuration`] before any state
//!   changes (unless [`MissingRefreshPolicy::Ignore`]).
//! - **Refresh function fails**: the field is re-enabled with its old options,
//!   observers get [`StoreEvent::RefreshFailed`], the task yields
//!   [`StoreError::Refresh`].

use std::cell::RefCell;
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};
use futures::FutureExt;
use futures::future::{LocalBoxFuture, ready};
use futures::task::{LocalSpawn, LocalSpawnExt};
use tracing::Instrument;

use crate::config::{EmptyPayloadPolicy, MissingRefreshPolicy, StoreConfig};
use crate::error::{RefreshError, Result, StoreError};
use crate::field::{FieldContent, FieldSnapshot, FormField, FormFieldSeed};
use crate::observer::{ChangeOrigin, Observers, SelectionChange, StoreEvent, Subscription};
use crate::ordering;
use crate::refresh::{RefreshFn, RefreshOutcome, RefreshParams, RefreshTask};
use crate::value::FormValue;

/// Field id used in errors that concern the store as a whole.
const STORE_SCOPE: &str = "*";

#[derive(Default)]
struct StoreState {
    initialized: bool,
    /// Insertion order.
    fields: Vec<FormField>,
    index: AHashMap<String, usize>,
}

impl StoreState {
    fn get(&self, field_id: &str) -> Result<&FormField> {
        self.index
            .get(field_id)
            .map(|&i| &self.fields[i])
            .ok_or_else(|| StoreError::lookup(field_id))
    }

    fn get_mut(&mut self, field_id: &str) -> Result<&mut FormField> {
        match self.index.get(field_id) {
            Some(&i) => Ok(&mut self.fields[i]),
            None => Err(StoreError::lookup(field_id)),
        }
    }

    fn ordered_ids(&self) -> Vec<String> {
        ordering::ordered_ids(
            self.fields
                .iter()
                .map(|field| (field.id.as_str(), field.order_index)),
        )
    }
}

struct Shared {
    state: RefCell<StoreState>,
    observers: Observers,
    spawner: Box<dyn LocalSpawn>,
    config: StoreConfig,
}

/// Handle to a reactive field store. Clones share the same store.
#[derive(Clone)]
pub struct FieldStore {
    shared: Rc<Shared>,
}

impl std::fmt::Debug for FieldStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("FieldStore")
            .field("initialized", &state.initialized)
            .field("fields", &state.fields)
            .field("observers", &self.shared.observers.len())
            .field("config", &self.shared.config)
            .finish()
    }
}

impl FieldStore {
    /// Create an empty store with the default configuration.
    ///
    /// Dependent refreshes are spawned on `spawner`, e.g.
    /// `futures::executor::LocalPool::spawner()`.
    #[must_use]
    pub fn new(spawner: impl LocalSpawn + 'static) -> Self {
        Self::with_config(spawner, StoreConfig::default())
    }

    #[must_use]
    pub fn with_config(spawner: impl LocalSpawn + 'static, config: StoreConfig) -> Self {
        Self {
            shared: Rc::new(Shared {
                state: RefCell::new(StoreState::default()),
                observers: Observers::default(),
                spawner: Box::new(spawner),
                config,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.shared.config
    }

    // ── Initialization ──────────────────────────────────────────────────

    /// Populate the store from field seeds.
    ///
    /// All seeds are validated before anything is committed, so a failed call
    /// leaves the store empty. May only succeed once per store.
    pub fn initialize(&self, seeds: impl IntoIterator<Item = FormFieldSeed>) -> Result<()> {
        if self.shared.state.borrow().initialized {
            return Err(StoreError::configuration(
                STORE_SCOPE,
                "store is already initialized",
            ));
        }

        let mut fields = Vec::new();
        let mut index = AHashMap::new();
        for seed in seeds {
            let field = seed.into_field()?;
            if index.contains_key(&field.id) {
                return Err(StoreError::configuration(&field.id, "duplicate field id"));
            }
            index.insert(field.id.clone(), fields.len());
            fields.push(field);
        }

        for field in &fields {
            if let Some(target) = field.dependent.as_deref()
                && !index.contains_key(target)
            {
                return Err(StoreError::configuration(
                    &field.id,
                    format!("dependent field {target} does not exist"),
                ));
            }
        }
        if let Some(field_id) = find_dependency_cycle(&fields, &index) {
            return Err(StoreError::configuration(
                field_id,
                "dependent fields form a cycle",
            ));
        }

        let count = fields.len();
        {
            let mut state = self.shared.state.borrow_mut();
            state.fields = fields;
            state.index = index;
            state.initialized = true;
        }
        tracing::info!(message = "store.initialize", fields = count);
        Ok(())
    }

    // ── Derived views ───────────────────────────────────────────────────

    /// Field ids in display order, recomputed on every call.
    #[must_use]
    pub fn ordered_field_ids(&self) -> Vec<String> {
        self.shared.state.borrow().ordered_ids()
    }

    #[must_use]
    pub fn has_any_field(&self) -> bool {
        !self.shared.state.borrow().fields.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.state.borrow().fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.has_any_field()
    }

    /// Clone of a field's current state.
    #[must_use]
    pub fn field(&self, field_id: &str) -> Option<FormField> {
        self.shared.state.borrow().get(field_id).ok().cloned()
    }

    /// Run `f` against a field without cloning it.
    ///
    /// # Panics
    ///
    /// Panics if `f` mutates the store (re-entrant borrow).
    pub fn with_field<R>(&self, field_id: &str, f: impl FnOnce(&FormField) -> R) -> Result<R> {
        let state = self.shared.state.borrow();
        state.get(field_id).map(f)
    }

    /// Snapshots of every field, in display order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<FieldSnapshot> {
        let state = self.shared.state.borrow();
        state
            .ordered_ids()
            .iter()
            .filter_map(|id| state.get(id).ok())
            .map(FormField::snapshot)
            .collect()
    }

    // ── Observation ─────────────────────────────────────────────────────

    /// Register for every store event. Dropping the guard unsubscribes.
    pub fn subscribe(&self, callback: impl Fn(&StoreEvent) + 'static) -> Subscription {
        self.shared.observers.subscribe(callback)
    }

    /// Register for committed selection changes only.
    pub fn on_selection_changed(
        &self,
        callback: impl Fn(&SelectionChange) + 'static,
    ) -> Subscription {
        self.shared.observers.subscribe(move |event| {
            if let StoreEvent::SelectionChanged(change) = event {
                callback(change);
            }
        })
    }

    fn notify_selection_changed(
        events: &mut Vec<StoreEvent>,
        field_id: &str,
        value: Option<String>,
        origin: ChangeOrigin,
    ) {
        events.push(StoreEvent::SelectionChanged(SelectionChange {
            field_id: field_id.to_string(),
            value,
            origin,
        }));
    }

    // ── Mutation ────────────────────────────────────────────────────────

    /// Set a field's value.
    ///
    /// On an option-based field `value` is an option id; `None` or an empty
    /// string clears the selection. On a free-text field it replaces the text.
    /// If the field declares a dependent, that field's refresh is started
    /// with the new value as payload and finishes on the executor.
    ///
    /// Lookup and reference failures leave the store untouched. A failure to
    /// start the dependent refresh is returned after this field's own value
    /// has been committed and observers have been told.
    ///
    /// Observers see the dependent's `RefreshStarted` before this field's
    /// `SelectionChanged`.
    pub fn set_selection(&self, field_id: &str, value: Option<&str>) -> Result<()> {
        let mut events = Vec::new();
        let trigger = {
            let mut state = self.shared.state.borrow_mut();
            let field = state.get_mut(field_id)?;

            let params = if field.is_option_based() {
                let previous = field.selected_id().map(str::to_string);
                match value.filter(|v| !v.is_empty()) {
                    Some(option_id) => field.content.select(field_id, option_id)?,
                    None => {
                        field.content.clear_selection();
                    }
                }
                let current = field.selected_id().map(str::to_string);
                tracing::debug!(
                    message = "store.selection",
                    field_id,
                    value = current.as_deref().unwrap_or("")
                );
                if previous != current {
                    Self::notify_selection_changed(
                        &mut events,
                        field_id,
                        current.clone(),
                        ChangeOrigin::User,
                    );
                }
                RefreshParams::from_selection(current.as_deref())
            } else {
                let text = value.unwrap_or_default().to_string();
                tracing::debug!(message = "store.free_text", field_id, len = text.len());
                if self.shared.config.notify_free_text {
                    events.push(StoreEvent::FreeTextChanged {
                        field_id: field_id.to_string(),
                        value: text.clone(),
                    });
                }
                field.content = FieldContent::FreeText(text);
                RefreshParams::from_selection(value)
            };

            field.dependent.clone().map(|dependent| (dependent, params))
        };

        // The dependent refresh starts before observers run, so a callback
        // that changes this field again starts the newer refresh.
        let started = match trigger {
            Some((dependent, params)) => self.spawn_refresh(&dependent, params),
            None => Ok(()),
        };
        self.shared.observers.notify_all(events);
        started
    }

    /// Attach or replace a field's refresh function.
    pub fn attach_refresh(&self, field_id: &str, refresh: RefreshFn) -> Result<()> {
        let mut state = self.shared.state.borrow_mut();
        state.get_mut(field_id)?.refresh = Some(refresh);
        Ok(())
    }

    /// Set or clear a field's validation message.
    pub fn set_error(&self, field_id: &str, error: Option<String>) -> Result<()> {
        let mut state = self.shared.state.borrow_mut();
        state.get_mut(field_id)?.error = error;
        Ok(())
    }

    /// Flag required fields that hold no value.
    ///
    /// Every required field without a selection (or with blank text) gets the
    /// configured required message; every other field has its error cleared.
    /// Returns the offending ids in display order.
    pub fn validate_required(&self) -> Vec<String> {
        let message = &self.shared.config.required_message;
        let mut state = self.shared.state.borrow_mut();
        let order = state.ordered_ids();
        let mut missing = Vec::new();
        for id in order {
            let Ok(field) = state.get_mut(&id) else {
                continue;
            };
            if field.required && !field.has_value() {
                field.error = Some(message.clone());
                missing.push(id);
            } else {
                field.error = None;
            }
        }
        tracing::debug!(message = "store.validate", missing = missing.len());
        missing
    }

    // ── Refresh ─────────────────────────────────────────────────────────

    /// Start refreshing a field's options.
    ///
    /// Steps up to the suspension point run before this returns: the field is
    /// disabled and its selection cleared (without propagating further
    /// downstream). The returned task awaits the refresh function and applies
    /// its result. Errors for unknown fields or a missing refresh function
    /// are returned here, before any state changes.
    pub fn refresh_field(&self, field_id: &str, params: RefreshParams) -> Result<RefreshTask> {
        let mut events = Vec::new();
        let (refresh, generation) = {
            let mut state = self.shared.state.borrow_mut();
            let field = state.get_mut(field_id)?;

            let Some(refresh) = field.refresh.clone() else {
                return match self.shared.config.missing_refresh {
                    MissingRefreshPolicy::Fail => Err(StoreError::configuration(
                        field_id,
                        "no refresh function attached",
                    )),
                    MissingRefreshPolicy::Ignore => {
                        tracing::debug!(message = "store.refresh.not_configured", field_id);
                        Ok(ready(Ok(RefreshOutcome::NotConfigured)).boxed_local())
                    }
                };
            };

            field.refresh_generation += 1;
            field.disabled = true;
            events.push(StoreEvent::RefreshStarted {
                field_id: field_id.to_string(),
            });
            if field.content.clear_selection().is_some() {
                Self::notify_selection_changed(
                    &mut events,
                    field_id,
                    None,
                    ChangeOrigin::Refresh,
                );
            }
            (refresh, field.refresh_generation)
        };
        tracing::debug!(
            message = "store.refresh.start",
            field_id,
            generation,
            parent = params.id.as_deref().unwrap_or("")
        );

        let mut guard = InFlight {
            shared: Rc::clone(&self.shared),
            field_id: field_id.to_string(),
            generation,
            armed: true,
        };

        if !params.has_payload() {
            match self.shared.config.empty_payload {
                EmptyPayloadPolicy::ReEnable => drop(guard),
                EmptyPayloadPolicy::KeepDisabled => guard.armed = false,
            }
            events.push(StoreEvent::RefreshSkipped {
                field_id: field_id.to_string(),
            });
            tracing::debug!(message = "store.refresh.skip", field_id);
            self.shared.observers.notify_all(events);
            return Ok(ready(Ok(RefreshOutcome::Skipped)).boxed_local());
        }

        self.shared.observers.notify_all(events);

        let span = tracing::debug_span!("store.refresh", field_id, generation);
        let task = async move {
            let result = refresh(params).await;
            guard.finish(result)
        };
        Ok(task.instrument(span).boxed_local())
    }

    /// Start a dependent refresh and hand the task to the executor.
    fn spawn_refresh(&self, field_id: &str, params: RefreshParams) -> Result<()> {
        let task: LocalBoxFuture<'static, Result<RefreshOutcome>> =
            self.refresh_field(field_id, params)?;
        self.shared
            .spawner
            .spawn_local(async move {
                // Failures already reached observers and the log.
                let _ = task.await;
            })
            .map_err(|_| StoreError::Spawn {
                field_id: field_id.to_string(),
            })
    }
}

/// A refresh between its start and its completion.
///
/// Dropping the guard re-enables the field if this is still its latest
/// refresh. Disarmed only by the keep-disabled empty-payload policy.
///
/// The reset needs the store borrow. If the guard is dropped while that
/// borrow is held, which only happens when a task is dropped inside a
/// [`FieldStore::with_field`] closure, the field stays disabled until its
/// next refresh and a `store.refresh.reset_skipped` warning is logged.
struct InFlight {
    shared: Rc<Shared>,
    field_id: String,
    generation: u64,
    armed: bool,
}

impl InFlight {
    fn finish(
        self,
        result: std::result::Result<Vec<FormValue>, RefreshError>,
    ) -> Result<RefreshOutcome> {
        let (outcome, event) = {
            let mut state = self.shared.state.borrow_mut();
            let field = state.get_mut(&self.field_id)?;

            if field.refresh_generation != self.generation {
                tracing::debug!(
                    message = "store.refresh.superseded",
                    field_id = %self.field_id,
                    generation = self.generation,
                    latest = field.refresh_generation
                );
                return Ok(RefreshOutcome::Superseded);
            }

            match result {
                Ok(options) => {
                    let option_count = options.len();
                    field.content.replace_options(options);
                    field.disabled = false;
                    tracing::info!(
                        message = "store.refresh.apply",
                        field_id = %self.field_id,
                        option_count
                    );
                    (
                        Ok(RefreshOutcome::Applied { option_count }),
                        StoreEvent::RefreshApplied {
                            field_id: self.field_id.clone(),
                            option_count,
                        },
                    )
                }
                Err(source) => {
                    tracing::warn!(
                        message = "store.refresh.failed",
                        field_id = %self.field_id,
                        error = %source
                    );
                    let error = StoreError::Refresh {
                        field_id: self.field_id.clone(),
                        source,
                    };
                    (
                        Err(error.clone()),
                        StoreEvent::RefreshFailed {
                            field_id: self.field_id.clone(),
                            error,
                        },
                    )
                }
            }
        };

        let shared = Rc::clone(&self.shared);
        drop(self);
        shared.observers.notify(&event);
        outcome
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(mut state) = self.shared.state.try_borrow_mut() else {
            tracing::warn!(
                message = "store.refresh.reset_skipped",
                field_id = %self.field_id
            );
            return;
        };
        if let Ok(field) = state.get_mut(&self.field_id)
            && field.refresh_generation == self.generation
        {
            field.disabled = false;
        }
    }
}

/// Return the id of some field on a dependency cycle, if any.
///
/// Every field has at most one outgoing edge, so each walk is a simple chain.
fn find_dependency_cycle<'a>(
    fields: &'a [FormField],
    index: &AHashMap<String, usize>,
) -> Option<&'a str> {
    let mut cleared: AHashSet<usize> = AHashSet::new();
    for start in 0..fields.len() {
        let mut path: AHashSet<usize> = AHashSet::new();
        let mut current = Some(start);
        while let Some(i) = current {
            if cleared.contains(&i) {
                break;
            }
            if !path.insert(i) {
                return Some(fields[i].id.as_str());
            }
            current = fields[i]
                .dependent
                .as_deref()
                .and_then(|target| index.get(target).copied());
        }
        cleared.extend(path);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refresh::refresh_fn;
    use futures::executor::LocalPool;

    fn status_seed() -> FormFieldSeed {
        FormFieldSeed::new("statusId", "Status")
            .required()
            .order_index("1")
            .options([
                FormValue::new("zaebis", "Zaebis", "zaebis"),
                FormValue::new("chetko", "Chotko", "chetko"),
                FormValue::new("pazani", "Pazani", "pazani"),
            ])
            .selected("pazani")
    }

    fn description_seed() -> FormFieldSeed {
        FormFieldSeed::new("description", "Description")
            .order_index("0")
            .free_text("Too short")
    }

    fn constant_refresh(ids: &'static [&'static str]) -> RefreshFn {
        refresh_fn(move |_: RefreshParams| async move {
            let options: Vec<FormValue> = ids.iter().map(|id| FormValue::simple(*id)).collect();
            Ok::<_, RefreshError>(options)
        })
    }

    fn new_store() -> (LocalPool, FieldStore) {
        let pool = LocalPool::new();
        let store = FieldStore::new(pool.spawner());
        (pool, store)
    }

    #[test]
    fn initialize_and_order() {
        let (_pool, store) = new_store();
        assert!(!store.has_any_field());
        store
            .initialize([status_seed(), description_seed()])
            .expect("valid seeds");
        assert!(store.has_any_field());
        assert_eq!(store.len(), 2);
        assert_eq!(store.ordered_field_ids(), ["description", "statusId"]);
        assert_eq!(
            store.field("statusId").and_then(|f| f.selected_id().map(str::to_string)),
            Some("pazani".to_string())
        );
    }

    #[test]
    fn initialize_twice_fails() {
        let (_pool, store) = new_store();
        store.initialize([status_seed()]).expect("first");
        let err = store.initialize([description_seed()]).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn initialize_rejects_duplicates_and_commits_nothing() {
        let (_pool, store) = new_store();
        let err = store
            .initialize([description_seed(), description_seed()])
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(!store.has_any_field());
        // A failed call does not consume the one-shot initialization.
        store.initialize([description_seed()]).expect("retry");
    }

    #[test]
    fn initialize_rejects_missing_dependent() {
        let (_pool, store) = new_store();
        let err = store
            .initialize([FormFieldSeed::new("a", "A").dependent("ghost")])
            .unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(err.field_id(), "a");
    }

    #[test]
    fn initialize_rejects_cycles() {
        let (_pool, store) = new_store();
        let err = store
            .initialize([
                FormFieldSeed::new("a", "A").dependent("b"),
                FormFieldSeed::new("b", "B").dependent("c"),
                FormFieldSeed::new("c", "C").dependent("a"),
            ])
            .unwrap_err();
        assert!(err.is_configuration());

        let (_pool, store) = new_store();
        let err = store
            .initialize([FormFieldSeed::new("self", "Self").dependent("self")])
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn chain_without_cycle_is_accepted() {
        let (_pool, store) = new_store();
        store
            .initialize([
                FormFieldSeed::new("a", "A").dependent("b"),
                FormFieldSeed::new("b", "B").dependent("c"),
                FormFieldSeed::new("c", "C"),
                FormFieldSeed::new("d", "D").dependent("c"),
            ])
            .expect("acyclic");
    }

    #[test]
    fn initialize_reports_bad_selection() {
        let (_pool, store) = new_store();
        let err = store
            .initialize([status_seed().selected("unknown")])
            .unwrap_err();
        assert!(err.is_reference());
    }

    #[test]
    fn select_and_clear() {
        let (_pool, store) = new_store();
        store.initialize([status_seed()]).expect("valid");

        store.set_selection("statusId", Some("chetko")).expect("offered");
        let field = store.field("statusId").expect("exists");
        assert_eq!(field.selected_option().map(FormValue::name), Some("Chotko"));

        store.set_selection("statusId", None).expect("clear");
        assert_eq!(store.field("statusId").and_then(|f| f.selected_id().map(str::to_string)), None);

        store.set_selection("statusId", Some("zaebis")).expect("offered");
        store.set_selection("statusId", Some("")).expect("empty clears");
        assert!(!store.field("statusId").expect("exists").has_value());
    }

    #[test]
    fn unknown_option_leaves_selection() {
        let (_pool, store) = new_store();
        store.initialize([status_seed()]).expect("valid");
        let err = store.set_selection("statusId", Some("nope")).unwrap_err();
        assert!(err.is_reference());
        assert_eq!(
            store.field("statusId").and_then(|f| f.selected_id().map(str::to_string)),
            Some("pazani".to_string())
        );
    }

    #[test]
    fn unknown_field_is_lookup_error() {
        let (_pool, store) = new_store();
        store.initialize([status_seed(), description_seed()]).expect("valid");
        let before = store.snapshot();
        let err = store.set_selection("ghost", Some("x")).unwrap_err();
        assert!(err.is_lookup());
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn free_text_overwrites() {
        let (mut pool, store) = new_store();
        store.initialize([description_seed()]).expect("valid");
        store
            .set_selection("description", Some("new text"))
            .expect("free text");
        assert_eq!(
            store.field("description").and_then(|f| f.free_text().map(str::to_string)),
            Some("new text".to_string())
        );
        assert!(!pool.try_run_one());
    }

    #[test]
    fn selection_events_only_on_change() {
        let (_pool, store) = new_store();
        store.initialize([status_seed()]).expect("valid");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = store.on_selection_changed(move |change| {
            sink.borrow_mut().push(change.value.clone());
        });

        store.set_selection("statusId", Some("pazani")).expect("same");
        store.set_selection("statusId", Some("chetko")).expect("change");
        store.set_selection("statusId", None).expect("clear");

        assert_eq!(
            *seen.borrow(),
            vec![Some("chetko".to_string()), None]
        );
    }

    #[test]
    fn free_text_events_follow_config() {
        let pool = LocalPool::new();
        let store = FieldStore::with_config(
            pool.spawner(),
            StoreConfig::default().with_free_text_notifications(true),
        );
        store.initialize([description_seed()]).expect("valid");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = store.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        store.set_selection("description", Some("x")).expect("text");
        assert_eq!(
            *seen.borrow(),
            vec![StoreEvent::FreeTextChanged {
                field_id: "description".into(),
                value: "x".into(),
            }]
        );

        let (_pool, quiet) = new_store();
        quiet.initialize([description_seed()]).expect("valid");
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let _sub = quiet.subscribe(move |_| *c.borrow_mut() += 1);
        quiet.set_selection("description", Some("x")).expect("text");
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn observer_can_write_another_field() {
        let (_pool, store) = new_store();
        store
            .initialize([status_seed(), description_seed()])
            .expect("valid");
        let handle = store.clone();
        let _sub = store.on_selection_changed(move |change| {
            if change.field_id == "statusId" {
                let text = format!("status is {}", change.value.as_deref().unwrap_or("none"));
                handle
                    .set_selection("description", Some(&text))
                    .expect("free text write");
            }
        });

        store.set_selection("statusId", Some("chetko")).expect("offered");
        assert_eq!(
            store.field("description").and_then(|f| f.free_text().map(str::to_string)),
            Some("status is chetko".to_string())
        );
    }

    #[test]
    fn refresh_without_function_fails_fast() {
        let (_pool, store) = new_store();
        store.initialize([description_seed()]).expect("valid");
        let Err(err) = store.refresh_field("description", RefreshParams::new("x")) else {
            panic!("expected configuration error");
        };
        assert!(err.is_configuration());
        assert!(!store.field("description").expect("exists").is_disabled());
    }

    #[test]
    fn refresh_without_function_can_be_ignored() {
        let pool = LocalPool::new();
        let store = FieldStore::with_config(
            pool.spawner(),
            StoreConfig::default().with_missing_refresh(MissingRefreshPolicy::Ignore),
        );
        store.initialize([description_seed()]).expect("valid");
        let task = store
            .refresh_field("description", RefreshParams::new("x"))
            .expect("ignored");
        assert_eq!(
            futures::executor::block_on(task),
            Ok(RefreshOutcome::NotConfigured)
        );
    }

    #[test]
    fn refresh_unknown_field_is_lookup_error() {
        let (_pool, store) = new_store();
        store.initialize([description_seed()]).expect("valid");
        let Err(err) = store.refresh_field("ghost", RefreshParams::new("x")) else {
            panic!("expected lookup error");
        };
        assert!(err.is_lookup());
    }

    #[test]
    fn dropped_task_reenables_field() {
        let (_pool, store) = new_store();
        store
            .initialize([FormFieldSeed::new("b", "B").refresh(constant_refresh(&["p"]))])
            .expect("valid");
        let task = store
            .refresh_field("b", RefreshParams::new("x"))
            .expect("configured");
        assert!(store.field("b").expect("exists").is_disabled());
        drop(task);
        assert!(!store.field("b").expect("exists").is_disabled());
        assert!(store.field("b").expect("exists").options().is_empty());
    }

    #[test]
    fn task_dropped_under_with_field_stays_disabled_until_next_refresh() {
        let (_pool, store) = new_store();
        store
            .initialize([FormFieldSeed::new("b", "B").refresh(constant_refresh(&["p"]))])
            .expect("valid");
        let task = store
            .refresh_field("b", RefreshParams::new("x"))
            .expect("configured");
        store
            .with_field("b", move |_| drop(task))
            .expect("exists");
        assert!(store.field("b").expect("exists").is_disabled());

        let outcome = futures::executor::block_on(
            store
                .refresh_field("b", RefreshParams::new("y"))
                .expect("configured"),
        );
        assert_eq!(outcome, Ok(RefreshOutcome::Applied { option_count: 1 }));
        assert!(!store.field("b").expect("exists").is_disabled());
    }

    #[test]
    fn attach_refresh_after_initialize() {
        let (_pool, store) = new_store();
        store.initialize([description_seed()]).expect("valid");
        store
            .attach_refresh("description", constant_refresh(&["p"]))
            .expect("exists");
        assert!(store.field("description").expect("exists").has_refresh());
        let outcome = futures::executor::block_on(
            store
                .refresh_field("description", RefreshParams::new("x"))
                .expect("configured"),
        );
        assert_eq!(outcome, Ok(RefreshOutcome::Applied { option_count: 1 }));
        assert!(store.field("description").expect("exists").is_option_based());

        let err = store
            .attach_refresh("ghost", constant_refresh(&[]))
            .unwrap_err();
        assert!(err.is_lookup());
    }

    #[test]
    fn validate_required_marks_missing() {
        let (_pool, store) = new_store();
        store
            .initialize([
                status_seed(),
                description_seed().required().free_text(""),
            ])
            .expect("valid");
        assert_eq!(store.validate_required(), ["description"]);
        assert_eq!(
            store.field("description").and_then(|f| f.error().map(str::to_string)),
            Some(crate::config::DEFAULT_REQUIRED_MESSAGE.to_string())
        );

        store.set_selection("statusId", None).expect("clear");
        store
            .set_selection("description", Some("filled"))
            .expect("text");
        assert_eq!(store.validate_required(), ["statusId"]);
        assert_eq!(store.field("description").expect("exists").error(), None);
    }

    #[test]
    fn set_error_round_trip() {
        let (_pool, store) = new_store();
        store.initialize([status_seed()]).expect("valid");
        store
            .set_error("statusId", Some("pick one".into()))
            .expect("exists");
        assert_eq!(
            store.with_field("statusId", |f| f.error().map(str::to_string)),
            Ok(Some("pick one".to_string()))
        );
        assert!(store.set_error("ghost", None).unwrap_err().is_lookup());
    }

    #[test]
    fn snapshot_in_display_order() {
        let (_pool, store) = new_store();
        store
            .initialize([status_seed(), description_seed()])
            .expect("valid");
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].id, "description");
        assert_eq!(snapshot[0].free_text.as_deref(), Some("Too short"));
        assert_eq!(snapshot[1].label, "Status *");
        assert_eq!(snapshot[1].selected.as_deref(), Some("pazani"));
    }
}
