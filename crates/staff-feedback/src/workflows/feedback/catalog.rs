use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use super::domain::UnitName;
use super::notify::{Notification, Notifier};
use super::repository::StaffDirectory;

/// Distinct normalized unit names, loaded once per session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UnitCatalog {
    units: Vec<UnitName>,
}

impl UnitCatalog {
    /// Load the catalog. A store failure yields an empty catalog and an error
    /// notification; the form remains usable.
    pub async fn load(directory: &dyn StaffDirectory, notifier: &dyn Notifier) -> Self {
        match directory.unit_values().await {
            Ok(values) => {
                let catalog = Self::from_values(values);
                info!(units = catalog.len(), "unit catalog loaded");
                catalog
            }
            Err(err) => {
                warn!(error = %err, "unit catalog unavailable");
                notifier.notify(Notification::error(
                    "Unable to load units",
                    err.to_string(),
                ));
                Self::default()
            }
        }
    }

    /// Normalize, drop blanks, and de-duplicate keeping first occurrence.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let units = values
            .into_iter()
            .filter_map(|value| UnitName::parse(value.as_ref()))
            .filter(|unit| seen.insert(unit.clone()))
            .collect();
        Self { units }
    }

    pub fn units(&self) -> &[UnitName] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
