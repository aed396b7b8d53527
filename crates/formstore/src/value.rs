#![forbid(unsafe_code)]

//! Selectable option values.

/// One option of a selectable field.
///
/// Immutable once created: the store replaces whole option sets, it never
/// edits an option in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormValue {
    id: String,
    name: String,
    value: String,
}

impl FormValue {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            value: value.into(),
        }
    }

    /// An option whose display name and value both equal its id.
    #[must_use]
    pub fn simple(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            value: id.clone(),
            id,
        }
    }

    /// Unique key within the owning field.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Underlying value submitted for this option.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}
