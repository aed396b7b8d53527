//! Seed data for the demo form.
//!
//! A seed file is JSON with two keys: `fields`, a list of field definitions
//! in the store's seed format, and `catalogue`, a map from a parent option id
//! to the options its dependent field receives. Every field named as a
//! dependent is refreshed from the catalogue.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use formstore::{FormFieldSeed, FormValue, RefreshError, RefreshFn, RefreshParams, refresh_fn};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Parent option id to child options.
pub type Catalogue = BTreeMap<String, Vec<FormValue>>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeedFile {
    pub fields: Vec<FormFieldSeed>,
    pub catalogue: Catalogue,
}

impl SeedFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// The form the demo runs when no seed file is given.
    #[must_use]
    pub fn builtin() -> Self {
        let fields = vec![
            FormFieldSeed::new("statusId", "Status")
                .options([
                    FormValue::new("zaebis", "Excellent", "zaebis"),
                    FormValue::new("chetko", "Solid", "chetko"),
                    FormValue::new("pazani", "Crew", "pazani"),
                ])
                .selected("pazani")
                .required()
                .order_index("1"),
            FormFieldSeed::new("description", "Description").order_index("0"),
            FormFieldSeed::new("category", "Category")
                .options([
                    FormValue::new("books", "Books", "books"),
                    FormValue::new("games", "Games", "games"),
                ])
                .required()
                .order_index("2")
                .dependent("subcategory"),
            FormFieldSeed::new("subcategory", "Subcategory").disabled(),
        ];

        let mut catalogue = Catalogue::new();
        catalogue.insert(
            "books".to_string(),
            vec![
                FormValue::new("fiction", "Fiction", "fiction"),
                FormValue::new("poetry", "Poetry", "poetry"),
            ],
        );
        catalogue.insert(
            "games".to_string(),
            vec![
                FormValue::new("board", "Board games", "board"),
                FormValue::new("video", "Video games", "video"),
                FormValue::new("puzzle", "Puzzles", "puzzle"),
            ],
        );

        Self { fields, catalogue }
    }

    /// Field seeds with a catalogue refresh attached to every dependent
    /// target that does not already carry one.
    #[must_use]
    pub fn into_seeds(self) -> Vec<FormFieldSeed> {
        let catalogue = Rc::new(self.catalogue);
        let targets: Vec<String> = self
            .fields
            .iter()
            .filter_map(|seed| seed.dependent.clone())
            .collect();
        self.fields
            .into_iter()
            .map(|mut seed| {
                if seed.refresh.is_none() && targets.contains(&seed.id) {
                    seed.refresh = Some(catalogue_refresh(Rc::clone(&catalogue)));
                }
                seed
            })
            .collect()
    }
}

/// Refresh function answering from an in-memory catalogue.
#[must_use]
pub fn catalogue_refresh(catalogue: Rc<Catalogue>) -> RefreshFn {
    refresh_fn(move |params: RefreshParams| {
        let catalogue = Rc::clone(&catalogue);
        async move {
            let key = params.id.unwrap_or_default();
            catalogue
                .get(&key)
                .cloned()
                .ok_or_else(|| RefreshError::new(format!("no catalogue entry for {key:?}")))
        }
    })
}
