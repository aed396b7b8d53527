#![forbid(unsafe_code)]

//! Form field records and the seeds they are built from.
//!
//! # Invariants
//!
//! 1. A field is either option-based or free-text, never both. This is carried
//!    by [`FieldContent`]: the selection only exists inside the `Options`
//!    variant, the text only inside `FreeText`.
//! 2. A selection is an option id, never an owned option. When present it
//!    names an entry of the same field's current option set.
//! 3. Replacing the option set drops the selection before the new options go
//!    in, so no selection can outlive the options it pointed into.

use std::fmt;

use crate::error::{Result, StoreError};
use crate::refresh::RefreshFn;
use crate::value::FormValue;

/// The value-carrying part of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldContent {
    /// Selectable field. `options` is never empty.
    Options {
        options: Vec<FormValue>,
        selected: Option<String>,
    },
    /// Free-text field.
    FreeText(String),
}

impl FieldContent {
    /// Build content from an option set, falling back to empty free text when
    /// the set is empty.
    #[must_use]
    pub(crate) fn from_options(options: Vec<FormValue>) -> Self {
        if options.is_empty() {
            Self::FreeText(String::new())
        } else {
            Self::Options {
                options,
                selected: None,
            }
        }
    }

    /// Point the selection at `option_id`, which must be offered.
    pub(crate) fn select(&mut self, field_id: &str, option_id: &str) -> Result<()> {
        match self {
            Self::Options { options, selected } => {
                if !options.iter().any(|o| o.id() == option_id) {
                    return Err(StoreError::reference(field_id, option_id));
                }
                *selected = Some(option_id.to_string());
                Ok(())
            }
            Self::FreeText(_) => Err(StoreError::reference(field_id, option_id)),
        }
    }

    /// Drop the selection, returning the id that was selected.
    pub(crate) fn clear_selection(&mut self) -> Option<String> {
        match self {
            Self::Options { selected, .. } => selected.take(),
            Self::FreeText(_) => None,
        }
    }

    /// Wholesale replacement of the option set. Any selection is cleared first.
    pub(crate) fn replace_options(&mut self, options: Vec<FormValue>) {
        self.clear_selection();
        *self = Self::from_options(options);
    }
}

/// One form control's state.
#[derive(Clone)]
pub struct FormField {
    pub(crate) id: String,
    pub(crate) label: String,
    pub(crate) disabled: bool,
    pub(crate) required: bool,
    pub(crate) error: Option<String>,
    pub(crate) order_index: Option<u32>,
    pub(crate) content: FieldContent,
    pub(crate) dependent: Option<String>,
    pub(crate) refresh: Option<RefreshFn>,
    /// Bumped every time a refresh starts on this field.
    pub(crate) refresh_generation: u64,
}

impl fmt::Debug for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormField")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("disabled", &self.disabled)
            .field("required", &self.required)
            .field("error", &self.error)
            .field("order_index", &self.order_index)
            .field("content", &self.content)
            .field("dependent", &self.dependent)
            .field("has_refresh", &self.refresh.is_some())
            .finish()
    }
}

impl FormField {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Label with a trailing ` *` on required fields.
    #[must_use]
    pub fn display_label(&self) -> String {
        if self.required {
            format!("{} *", self.label)
        } else {
            self.label.clone()
        }
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn order_index(&self) -> Option<u32> {
        self.order_index
    }

    #[must_use]
    pub fn content(&self) -> &FieldContent {
        &self.content
    }

    /// Current option set; empty for free-text fields.
    #[must_use]
    pub fn options(&self) -> &[FormValue] {
        match &self.content {
            FieldContent::Options { options, .. } => options,
            FieldContent::FreeText(_) => &[],
        }
    }

    #[must_use]
    pub fn is_option_based(&self) -> bool {
        matches!(self.content, FieldContent::Options { .. })
    }

    #[must_use]
    pub fn selected_id(&self) -> Option<&str> {
        match &self.content {
            FieldContent::Options { selected, .. } => selected.as_deref(),
            FieldContent::FreeText(_) => None,
        }
    }

    /// Resolve the selection against the current options.
    #[must_use]
    pub fn selected_option(&self) -> Option<&FormValue> {
        let id = self.selected_id()?;
        self.options().iter().find(|o| o.id() == id)
    }

    /// Text of a free-text field; `None` for option-based fields.
    #[must_use]
    pub fn free_text(&self) -> Option<&str> {
        match &self.content {
            FieldContent::FreeText(text) => Some(text),
            FieldContent::Options { .. } => None,
        }
    }

    /// Id of the field refreshed when this one's selection changes.
    #[must_use]
    pub fn dependent(&self) -> Option<&str> {
        self.dependent.as_deref()
    }

    #[must_use]
    pub fn has_refresh(&self) -> bool {
        self.refresh.is_some()
    }

    /// Whether the field currently holds a value: a selection, or non-empty
    /// text.
    #[must_use]
    pub fn has_value(&self) -> bool {
        match &self.content {
            FieldContent::Options { selected, .. } => selected.is_some(),
            FieldContent::FreeText(text) => !text.trim().is_empty(),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot {
            id: self.id.clone(),
            label: self.display_label(),
            disabled: self.disabled,
            required: self.required,
            error: self.error.clone(),
            order_index: self.order_index,
            options: self.options().to_vec(),
            selected: self.selected_id().map(str::to_string),
            free_text: self.free_text().map(str::to_string),
            dependent: self.dependent.clone(),
        }
    }
}

/// Plain copy of a field's observable state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct FieldSnapshot {
    pub id: String,
    pub label: String,
    pub disabled: bool,
    pub required: bool,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub error: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub order_index: Option<u32>,
    pub options: Vec<FormValue>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub selected: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub free_text: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub dependent: Option<String>,
}

/// Definition of a field handed to [`crate::FieldStore::initialize`].
#[derive(Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct FormFieldSeed {
    pub id: String,
    pub label: String,
    pub disabled: bool,
    pub required: bool,
    pub error: Option<String>,
    /// String-encoded non-negative integer.
    pub order_index: Option<String>,
    pub options: Vec<FormValue>,
    pub selected: Option<String>,
    pub free_text: String,
    pub dependent: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub refresh: Option<RefreshFn>,
}

impl fmt::Debug for FormFieldSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormFieldSeed")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("order_index", &self.order_index)
            .field("options", &self.options.len())
            .field("selected", &self.selected)
            .field("dependent", &self.dependent)
            .field("has_refresh", &self.refresh.is_some())
            .finish_non_exhaustive()
    }
}

impl FormFieldSeed {
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    #[must_use]
    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    #[must_use]
    pub fn order_index(mut self, index: impl Into<String>) -> Self {
        self.order_index = Some(index.into());
        self
    }

    #[must_use]
    pub fn options(mut self, options: impl IntoIterator<Item = FormValue>) -> Self {
        self.options = options.into_iter().collect();
        self
    }

    #[must_use]
    pub fn selected(mut self, option_id: impl Into<String>) -> Self {
        self.selected = Some(option_id.into());
        self
    }

    #[must_use]
    pub fn free_text(mut self, text: impl Into<String>) -> Self {
        self.free_text = text.into();
        self
    }

    #[must_use]
    pub fn dependent(mut self, field_id: impl Into<String>) -> Self {
        self.dependent = Some(field_id.into());
        self
    }

    #[must_use]
    pub fn refresh(mut self, refresh: RefreshFn) -> Self {
        self.refresh = Some(refresh);
        self
    }

    /// Validate the seed on its own and build the field.
    ///
    /// Cross-field checks (duplicates, dependency targets, cycles) belong to
    /// the store.
    pub(crate) fn into_field(self) -> Result<FormField> {
        let order_index = match self.order_index.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<u32>().map_err(|_| {
                StoreError::configuration(
                    &self.id,
                    format!("order index {raw:?} is not an integer"),
                )
            })?),
        };

        if !self.options.is_empty() && !self.free_text.is_empty() {
            return Err(StoreError::configuration(
                &self.id,
                "a field with options cannot also carry free text",
            ));
        }

        let mut seen = ahash::AHashSet::with_capacity(self.options.len());
        for option in &self.options {
            if !seen.insert(option.id()) {
                return Err(StoreError::configuration(
                    &self.id,
                    format!("duplicate option id {:?}", option.id()),
                ));
            }
        }

        let content = if self.options.is_empty() {
            if let Some(option_id) = self.selected.as_deref().filter(|s| !s.is_empty()) {
                return Err(StoreError::reference(&self.id, option_id));
            }
            FieldContent::FreeText(self.free_text)
        } else {
            let mut content = FieldContent::from_options(self.options);
            if let Some(option_id) = self.selected.as_deref().filter(|s| !s.is_empty()) {
                content.select(&self.id, option_id)?;
            }
            content
        };

        Ok(FormField {
            id: self.id,
            label: self.label,
            disabled: self.disabled,
            required: self.required,
            error: self.error,
            order_index,
            content,
            dependent: self.dependent,
            refresh: self.refresh,
            refresh_generation: 0,
        })
    }
}
