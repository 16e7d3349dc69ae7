//! In-process repository.
//!
//! Holds tax data and saved scenarios in memory for the lifetime of the
//! process. Scenario ids start at 1 and are never reused.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use super::factory::{DbConfig, RepositoryFactory};
use super::repository::{CalculatorRepository, RepositoryError};
use crate::calculations::tax::TaxTables;
use crate::models::{
    CalculatorKind, FilingStatusCode, NewSavedScenario, SavedScenario, StandardDeduction,
    TaxBracket, TaxYearConfig,
};

#[derive(Debug, Default)]
struct State {
    configs: BTreeMap<i32, TaxYearConfig>,
    deductions: BTreeMap<(i32, FilingStatusCode), StandardDeduction>,
    brackets: BTreeMap<(i32, FilingStatusCode), Vec<TaxBracket>>,
    scenarios: BTreeMap<i64, SavedScenario>,
    next_id: i64,
}

#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: RwLock<State>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// A repository pre-loaded with every year in `tables`.
    pub fn with_tax_tables(tables: &TaxTables) -> Self {
        let mut state = State::default();
        for year in tables.years() {
            let Ok(table) = tables.get(year) else {
                continue;
            };
            state.configs.insert(year, table.config.clone());
            for (status, amount) in &table.standard_deductions {
                state.deductions.insert((year, *status), StandardDeduction {
                    tax_year: year,
                    filing_status: *status,
                    amount: *amount,
                });
            }
            for (status, brackets) in &table.brackets {
                state.brackets.insert((year, *status), brackets.clone());
            }
        }
        Self {
            state: RwLock::new(state),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, RepositoryError> {
        self.state
            .read()
            .map_err(|_| RepositoryError::Database("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, RepositoryError> {
        self.state
            .write()
            .map_err(|_| RepositoryError::Database("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl CalculatorRepository for MemoryRepository {
    async fn get_tax_year_config(&self, year: i32) -> Result<TaxYearConfig, RepositoryError> {
        self.read()?
            .configs
            .get(&year)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_tax_years(&self) -> Result<Vec<i32>, RepositoryError> {
        Ok(self.read()?.configs.keys().rev().copied().collect())
    }

    async fn get_standard_deduction(
        &self,
        tax_year: i32,
        filing_status: FilingStatusCode,
    ) -> Result<StandardDeduction, RepositoryError> {
        self.read()?
            .deductions
            .get(&(tax_year, filing_status))
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn get_tax_brackets(
        &self,
        tax_year: i32,
        filing_status: FilingStatusCode,
    ) -> Result<Vec<TaxBracket>, RepositoryError> {
        Ok(self
            .read()?
            .brackets
            .get(&(tax_year, filing_status))
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_tax_brackets(
        &self,
        tax_year: i32,
        filing_status: FilingStatusCode,
        brackets: &[TaxBracket],
    ) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        if !state.configs.contains_key(&tax_year) {
            return Err(RepositoryError::NotFound);
        }
        let mut sorted = brackets.to_vec();
        sorted.sort_by(|a, b| a.lower_bound.cmp(&b.lower_bound));
        state.brackets.insert((tax_year, filing_status), sorted);
        Ok(())
    }

    async fn create_scenario(
        &self,
        scenario: NewSavedScenario,
    ) -> Result<SavedScenario, RepositoryError> {
        let mut state = self.write()?;
        state.next_id += 1;
        let saved = SavedScenario {
            id: state.next_id,
            kind: scenario.kind(),
            name: scenario.name,
            input: scenario.input,
            result: scenario.result,
            saved_at: Utc::now(),
        };
        state.scenarios.insert(saved.id, saved.clone());
        info!(id = saved.id, name = %saved.name, "scenario saved");
        Ok(saved)
    }

    async fn get_scenario(&self, id: i64) -> Result<SavedScenario, RepositoryError> {
        self.read()?
            .scenarios
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete_scenario(&self, id: i64) -> Result<(), RepositoryError> {
        self.write()?
            .scenarios
            .remove(&id)
            .map(|_| info!(id, "scenario deleted"))
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_scenarios(
        &self,
        kind: Option<CalculatorKind>,
    ) -> Result<Vec<SavedScenario>, RepositoryError> {
        Ok(self
            .read()?
            .scenarios
            .values()
            .rev()
            .filter(|s| kind.is_none_or(|k| s.kind == k))
            .cloned()
            .collect())
    }
}

/// Backend `"memory"`. The connection string is ignored; each repository
/// starts with the built-in tax tables and no scenarios.
pub struct MemoryRepositoryFactory;

#[async_trait]
impl RepositoryFactory for MemoryRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create(
        &self,
        _config: &DbConfig,
    ) -> Result<Box<dyn CalculatorRepository>, RepositoryError> {
        Ok(Box::new(MemoryRepository::with_tax_tables(&TaxTables::builtin())))
    }
}
