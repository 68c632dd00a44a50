use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::domain::{StaffRecord, StaffRow, UnitName};
use super::repository::{StaffDirectory, StaffFilter, StoreError};
use super::text::{collapse_whitespace, contains_pattern};

/// Which lookup produced a roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPath {
    Exact,
    Fallback,
}

/// Staff resolved for one unit, ordered by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Roster {
    pub unit: UnitName,
    pub path: ResolutionPath,
    pub staff: Vec<StaffRecord>,
}

/// Resolves a unit to its roster: exact match first, escaped substring
/// match only when the exact lookup comes back empty.
#[derive(Clone)]
pub struct StaffResolver {
    directory: Arc<dyn StaffDirectory>,
}

impl StaffResolver {
    pub fn new(directory: Arc<dyn StaffDirectory>) -> Self {
        Self { directory }
    }

    pub async fn resolve(&self, unit: &UnitName) -> Result<Roster, StoreError> {
        let exact = self
            .directory
            .find_staff(&StaffFilter::UnitEquals(unit.as_str().to_string()))
            .await?;

        if !exact.is_empty() {
            debug!(%unit, staff = exact.len(), "roster resolved by exact match");
            return Ok(Roster {
                unit: unit.clone(),
                path: ResolutionPath::Exact,
                staff: coerce(&exact),
            });
        }

        let pattern = contains_pattern(unit.as_str());
        let candidates = self
            .directory
            .find_staff(&StaffFilter::UnitLike(pattern))
            .await?;

        let needle = collapse_whitespace(unit.as_str()).to_lowercase();
        let staff: Vec<StaffRecord> = coerce(&candidates)
            .into_iter()
            .filter(|record| {
                collapse_whitespace(&record.school)
                    .to_lowercase()
                    .contains(&needle)
            })
            .collect();

        debug!(%unit, staff = staff.len(), "roster resolved by fallback match");
        Ok(Roster {
            unit: unit.clone(),
            path: ResolutionPath::Fallback,
            staff,
        })
    }
}

fn coerce(rows: &[StaffRow]) -> Vec<StaffRecord> {
    rows.iter().map(StaffRecord::from_row).collect()
}
