//! Static list of conditions and their stock locations.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, ShelfError};

/// One experimental treatment to be replicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Unique identifier within the catalog.
    pub id: String,
    /// Physical stock location, `"{tray}-{position}"`, empty when unknown.
    pub location: String,
    /// Number of successful replicates required.
    pub target_replicates: u32,
}

/// Read-only catalog of conditions, loaded once at experiment start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionCatalog {
    conditions: Vec<Condition>,
}

impl ConditionCatalog {
    /// Builds a catalog, rejecting empty or duplicate identifiers.
    pub fn new(conditions: Vec<Condition>) -> Result<Self, ShelfError> {
        if conditions.is_empty() {
            return Err(ShelfError::Validation(ErrorInfo::new(
                "catalog-empty",
                "condition catalog contains no conditions",
            )));
        }
        let mut seen = BTreeSet::new();
        for condition in &conditions {
            if condition.id.trim().is_empty() {
                return Err(ShelfError::Validation(ErrorInfo::new(
                    "catalog-blank-id",
                    "condition identifiers must not be blank",
                )));
            }
            if !seen.insert(condition.id.as_str()) {
                return Err(ShelfError::Validation(
                    ErrorInfo::new("catalog-duplicate-id", "duplicate condition identifier")
                        .with_context("condition", condition.id.clone()),
                ));
            }
        }
        Ok(Self { conditions })
    }

    /// Builds a catalog from identifiers sharing one target and a location map.
    pub fn from_ids<I, S>(
        ids: I,
        target_replicates: u32,
        locations: &BTreeMap<String, String>,
    ) -> Result<Self, ShelfError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let conditions = ids
            .into_iter()
            .map(|id| {
                let id = id.into();
                let location = locations.get(&id).cloned().unwrap_or_default();
                Condition {
                    id,
                    location,
                    target_replicates,
                }
            })
            .collect();
        Self::new(conditions)
    }

    /// Loads the catalog from a conditions list and a stock location table.
    ///
    /// `conditions_csv` needs a `conditions` column. `stock_csv` needs `ID`,
    /// `Tray` and `Location` columns; conditions missing from it get an empty
    /// location.
    pub fn from_csv(
        conditions_csv: &Path,
        stock_csv: &Path,
        target_replicates: u32,
    ) -> Result<Self, ShelfError> {
        let ids = read_condition_ids(conditions_csv)?;
        let locations = read_stock_locations(stock_csv)?;
        Self::from_ids(ids, target_replicates, &locations)
    }

    /// Conditions in catalog order.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Condition identifiers in catalog order.
    pub fn ids(&self) -> Vec<String> {
        self.conditions.iter().map(|c| c.id.clone()).collect()
    }

    /// Identifier to stock location map.
    pub fn locations(&self) -> BTreeMap<String, String> {
        self.conditions
            .iter()
            .map(|c| (c.id.clone(), c.location.clone()))
            .collect()
    }

    /// Replicate target the whole experiment must reach: the largest
    /// per-condition target.
    pub fn target_replicates_total(&self) -> u32 {
        self.conditions
            .iter()
            .map(|c| c.target_replicates)
            .max()
            .unwrap_or(0)
    }

    /// Conditions whose target differs from `target`.
    pub fn off_target(&self, target: u32) -> impl Iterator<Item = &Condition> {
        self.conditions
            .iter()
            .filter(move |c| c.target_replicates != target)
    }

    /// Number of conditions.
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// True when the catalog holds no conditions.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

fn read_condition_ids(path: &Path) -> Result<Vec<String>, ShelfError> {
    let mut reader = open_reader(path)?;
    let headers = read_headers(&mut reader, path)?;
    let column = column_index(&headers, "conditions", path)?;
    let mut ids = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| ShelfError::io("catalog-record", path, err))?;
        match record.get(column) {
            Some(value) if !value.is_empty() => ids.push(value.to_string()),
            _ => {}
        }
    }
    if ids.is_empty() {
        return Err(ShelfError::Validation(
            ErrorInfo::new("catalog-no-conditions", "no usable conditions found")
                .with_path(path),
        ));
    }
    Ok(ids)
}

fn read_stock_locations(path: &Path) -> Result<BTreeMap<String, String>, ShelfError> {
    let mut reader = open_reader(path)?;
    let headers = read_headers(&mut reader, path)?;
    let id_col = column_index(&headers, "ID", path)?;
    let tray_col = column_index(&headers, "Tray", path)?;
    let location_col = column_index(&headers, "Location", path)?;
    let mut locations = BTreeMap::new();
    for record in reader.records() {
        let record = record.map_err(|err| ShelfError::io("stock-record", path, err))?;
        let id = record.get(id_col).unwrap_or_default();
        if id.is_empty() {
            continue;
        }
        let tray = record.get(tray_col).unwrap_or_default();
        let slot = record.get(location_col).unwrap_or_default();
        locations.insert(id.to_string(), format!("{tray}-{slot}"));
    }
    Ok(locations)
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>, ShelfError> {
    ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|err| ShelfError::io("csv-open", path, err))
}

fn read_headers(
    reader: &mut csv::Reader<std::fs::File>,
    path: &Path,
) -> Result<StringRecord, ShelfError> {
    reader
        .headers()
        .cloned()
        .map_err(|err| ShelfError::io("csv-headers", path, err))
}

fn column_index(headers: &StringRecord, name: &str, path: &Path) -> Result<usize, ShelfError> {
    headers.iter().position(|h| h == name).ok_or_else(|| {
        ShelfError::Validation(
            ErrorInfo::new("csv-missing-column", format!("'{name}' column not found"))
                .with_path(path),
        )
    })
}
