use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use calc_core::{
    CalculatorKind, CalculatorRepository, FilingStatusCode, NewSavedScenario, RepositoryError,
    SavedScenario, StandardDeduction, TaxBracket, TaxYearConfig,
};
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::{debug, info};

use crate::decimal::{decimal_to_text, get_decimal, get_optional_decimal};

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Connect to a sqlx-style URL (`sqlite:path` or `sqlite::memory:`).
    ///
    /// File databases are created if missing. An in-memory database lives on
    /// a single pooled connection that is never recycled.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new();
        if database_url.contains(":memory:") {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Load and execute all SQL seed files from the specified directory.
    /// Files are executed in alphabetical order by filename.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
            debug!(file = %path.display(), "applied seed file");
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn get_filing_status(
    row: &SqliteRow,
    column: &str,
) -> Result<FilingStatusCode, RepositoryError> {
    let code: String = row.try_get(column).map_err(db_err)?;
    FilingStatusCode::parse(&code).ok_or_else(|| {
        RepositoryError::Database(format!("Unknown filing status '{}' in '{}'", code, column))
    })
}

fn row_to_tax_bracket(row: &SqliteRow) -> Result<TaxBracket, RepositoryError> {
    Ok(TaxBracket {
        tax_year: row.try_get("tax_year").map_err(db_err)?,
        filing_status: get_filing_status(row, "filing_status")?,
        lower_bound: get_decimal(row, "lower_bound")?,
        upper_bound: get_optional_decimal(row, "upper_bound")?,
        rate: get_decimal(row, "rate")?,
    })
}

fn row_to_saved_scenario(row: &SqliteRow) -> Result<SavedScenario, RepositoryError> {
    let mode: String = row.try_get("mode").map_err(db_err)?;
    let kind = CalculatorKind::parse(&mode).ok_or_else(|| {
        RepositoryError::Database(format!("Unknown calculator mode '{}'", mode))
    })?;
    let input_snapshot: String = row.try_get("input_snapshot").map_err(db_err)?;
    let result_snapshot: String = row.try_get("result_snapshot").map_err(db_err)?;

    Ok(SavedScenario {
        id: row.try_get("id").map_err(db_err)?,
        name: row.try_get("name").map_err(db_err)?,
        kind,
        input: serde_json::from_str(&input_snapshot)?,
        result: serde_json::from_str(&result_snapshot)?,
        saved_at: row
            .try_get::<DateTime<Utc>, _>("saved_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get saved_at: {}", e)))?,
    })
}

#[async_trait]
impl CalculatorRepository for SqliteRepository {
    async fn get_tax_year_config(
        &self,
        year: i32,
    ) -> Result<TaxYearConfig, RepositoryError> {
        let row = sqlx::query(
            "SELECT tax_year, retirement_plan_limit, ira_limit, hsa_limit,
                    student_loan_interest_limit
             FROM tax_year_config WHERE tax_year = ?",
        )
        .bind(year)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(TaxYearConfig {
            tax_year: row.try_get("tax_year").map_err(db_err)?,
            retirement_plan_limit: get_decimal(&row, "retirement_plan_limit")?,
            ira_limit: get_decimal(&row, "ira_limit")?,
            hsa_limit: get_decimal(&row, "hsa_limit")?,
            student_loan_interest_limit: get_decimal(&row, "student_loan_interest_limit")?,
        })
    }

    async fn list_tax_years(&self) -> Result<Vec<i32>, RepositoryError> {
        let rows = sqlx::query("SELECT tax_year FROM tax_year_config ORDER BY tax_year DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter()
            .map(|row| row.try_get("tax_year").map_err(db_err))
            .collect()
    }

    async fn get_standard_deduction(
        &self,
        tax_year: i32,
        filing_status: FilingStatusCode,
    ) -> Result<StandardDeduction, RepositoryError> {
        let row = sqlx::query(
            "SELECT tax_year, filing_status, amount
             FROM standard_deductions
             WHERE tax_year = ? AND filing_status = ?",
        )
        .bind(tax_year)
        .bind(filing_status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(StandardDeduction {
            tax_year: row.try_get("tax_year").map_err(db_err)?,
            filing_status: get_filing_status(&row, "filing_status")?,
            amount: get_decimal(&row, "amount")?,
        })
    }

    async fn get_tax_brackets(
        &self,
        tax_year: i32,
        filing_status: FilingStatusCode,
    ) -> Result<Vec<TaxBracket>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT tax_year, filing_status, lower_bound, upper_bound, rate
             FROM tax_brackets
             WHERE tax_year = ? AND filing_status = ?
             ORDER BY CAST(lower_bound AS REAL)",
        )
        .bind(tax_year)
        .bind(filing_status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_tax_bracket).collect()
    }

    async fn replace_tax_brackets(
        &self,
        tax_year: i32,
        filing_status: FilingStatusCode,
        brackets: &[TaxBracket],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("SELECT 1 FROM tax_year_config WHERE tax_year = ?")
            .bind(tax_year)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
            .ok_or(RepositoryError::NotFound)?;

        sqlx::query("DELETE FROM tax_brackets WHERE tax_year = ? AND filing_status = ?")
            .bind(tax_year)
            .bind(filing_status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        for bracket in brackets {
            sqlx::query(
                "INSERT INTO tax_brackets (tax_year, filing_status, lower_bound, upper_bound, rate)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(tax_year)
            .bind(filing_status.as_str())
            .bind(decimal_to_text(bracket.lower_bound))
            .bind(bracket.upper_bound.map(decimal_to_text))
            .bind(decimal_to_text(bracket.rate))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        debug!(
            tax_year,
            filing_status = %filing_status,
            count = brackets.len(),
            "replaced tax brackets"
        );
        Ok(())
    }

    async fn create_scenario(
        &self,
        scenario: NewSavedScenario,
    ) -> Result<SavedScenario, RepositoryError> {
        let input_snapshot = serde_json::to_string(&scenario.input)?;
        let result_snapshot = serde_json::to_string(&scenario.result)?;

        let result = sqlx::query(
            "INSERT INTO saved_scenario (name, mode, input_snapshot, result_snapshot, saved_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&scenario.name)
        .bind(scenario.kind().as_str())
        .bind(input_snapshot)
        .bind(result_snapshot)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let id = result.last_insert_rowid();
        info!(id, name = %scenario.name, "scenario saved");
        self.get_scenario(id).await
    }

    async fn get_scenario(
        &self,
        id: i64,
    ) -> Result<SavedScenario, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, mode, input_snapshot, result_snapshot, saved_at
             FROM saved_scenario WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_saved_scenario(&row)
    }

    async fn delete_scenario(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM saved_scenario WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        info!(id, "scenario deleted");
        Ok(())
    }

    async fn list_scenarios(
        &self,
        kind: Option<CalculatorKind>,
    ) -> Result<Vec<SavedScenario>, RepositoryError> {
        const BASE_QUERY: &str =
            "SELECT id, name, mode, input_snapshot, result_snapshot, saved_at FROM saved_scenario";

        let rows = match kind {
            Some(kind) => {
                sqlx::query(&format!(
                    "{} WHERE mode = ? ORDER BY saved_at DESC, id DESC",
                    BASE_QUERY
                ))
                .bind(kind.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!("{} ORDER BY saved_at DESC, id DESC", BASE_QUERY))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(db_err)?;

        rows.iter().map(row_to_saved_scenario).collect()
    }
}
