use std::collections::BTreeMap;
use std::io::Read;

use calc_core::calculations::tax::{BracketTableError, validate_bracket_table};
use calc_core::{CalculatorRepository, FilingStatusCode, RepositoryError, TaxBracket};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur when loading tax bracket data.
#[derive(Debug, Error)]
pub enum TaxBracketLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Schedule {schedule} for {tax_year} is not a valid bracket table: {source}")]
    InvalidTable {
        tax_year: i32,
        schedule: String,
        #[source]
        source: BracketTableError,
    },

    #[error("Tax year {0} not found in database (have you run the seeds?)")]
    TaxYearNotFound(i32),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for TaxBracketLoaderError {
    fn from(err: csv::Error) -> Self {
        TaxBracketLoaderError::CsvParse(err.to_string())
    }
}

/// Maps IRS schedule codes to filing statuses.
///
/// - Schedule X → Single
/// - Schedule Y-1 → Married Filing Jointly and Qualifying Surviving Spouse
/// - Schedule Y-2 → Married Filing Separately
/// - Schedule Z → Head of Household
fn schedule_to_filing_statuses(
    schedule: &str
) -> Result<&'static [FilingStatusCode], TaxBracketLoaderError> {
    use FilingStatusCode::*;

    match schedule {
        "X" => Ok(&[Single]),
        "Y-1" => Ok(&[MarriedFilingJointly, QualifyingSurvivingSpouse]),
        "Y-2" => Ok(&[MarriedFilingSeparately]),
        "Z" => Ok(&[HeadOfHousehold]),
        _ => Err(TaxBracketLoaderError::InvalidSchedule(schedule.to_string())),
    }
}

/// A single record from the tax brackets CSV file.
///
/// - `tax_year`: e.g. 2025
/// - `schedule`: IRS schedule code (X, Y-1, Y-2, Z)
/// - `lower_bound`: income where the bracket starts
/// - `upper_bound`: income where it ends (empty for the top bracket)
/// - `rate`: marginal rate as a fraction (0.10 for 10%)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaxBracketRecord {
    pub tax_year: i32,
    pub schedule: String,
    pub lower_bound: Decimal,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub upper_bound: Option<Decimal>,
    pub rate: Decimal,
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// One validated table ready to be written for every status it covers.
struct PendingTable {
    tax_year: i32,
    statuses: &'static [FilingStatusCode],
    brackets: Vec<TaxBracket>,
}

/// Loads tax bracket tables from CSV into any [`CalculatorRepository`].
pub struct TaxBracketLoader;

impl TaxBracketLoader {
    /// Parse tax bracket records from any reader (file, byte slice, ...).
    pub fn parse<R: Read>(reader: R) -> Result<Vec<TaxBracketRecord>, TaxBracketLoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: TaxBracketRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Replace the stored brackets with the tables in `records`.
    ///
    /// Records are grouped by (tax year, schedule) and every group is
    /// validated before anything is written, so a bad file leaves the
    /// repository untouched. Each group then replaces the brackets of every
    /// status its schedule covers; Y-1 is written for both MFJ and QSS.
    ///
    /// Loading the same file twice produces the same result. Returns the
    /// number of bracket rows written.
    pub async fn load<R: CalculatorRepository + ?Sized>(
        repo: &R,
        records: &[TaxBracketRecord],
    ) -> Result<usize, TaxBracketLoaderError> {
        let tables = Self::prepare(records)?;

        let mut written = 0;
        for table in tables {
            for &status in table.statuses {
                let brackets: Vec<TaxBracket> = table
                    .brackets
                    .iter()
                    .map(|b| TaxBracket {
                        filing_status: status,
                        ..b.clone()
                    })
                    .collect();

                repo.replace_tax_brackets(table.tax_year, status, &brackets)
                    .await
                    .map_err(|e| match e {
                        RepositoryError::NotFound => {
                            TaxBracketLoaderError::TaxYearNotFound(table.tax_year)
                        }
                        other => TaxBracketLoaderError::Repository(other),
                    })?;
                debug!(tax_year = table.tax_year, %status, count = brackets.len(), "loaded brackets");
                written += brackets.len();
            }
        }

        info!(written, "tax brackets loaded");
        Ok(written)
    }

    fn prepare(records: &[TaxBracketRecord]) -> Result<Vec<PendingTable>, TaxBracketLoaderError> {
        let mut groups: BTreeMap<(i32, &str), Vec<&TaxBracketRecord>> = BTreeMap::new();
        for record in records {
            groups
                .entry((record.tax_year, record.schedule.as_str()))
                .or_default()
                .push(record);
        }

        groups
            .into_iter()
            .map(|((tax_year, schedule), mut group)| {
                let statuses = schedule_to_filing_statuses(schedule)?;
                group.sort_by(|a, b| a.lower_bound.cmp(&b.lower_bound));

                let brackets: Vec<TaxBracket> = group
                    .iter()
                    .map(|record| TaxBracket {
                        tax_year,
                        filing_status: statuses[0],
                        lower_bound: record.lower_bound,
                        upper_bound: record.upper_bound,
                        rate: record.rate,
                    })
                    .collect();

                validate_bracket_table(&brackets).map_err(|source| {
                    TaxBracketLoaderError::InvalidTable {
                        tax_year,
                        schedule: schedule.to_string(),
                        source,
                    }
                })?;

                Ok(PendingTable {
                    tax_year,
                    statuses,
                    brackets,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use calc_core::db::MemoryRepository;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    const HEADER: &str = "tax_year,schedule,lower_bound,upper_bound,rate\n";

    fn csv(rows: &str) -> String {
        format!("{HEADER}{rows}")
    }

    #[test]
    fn test_parse_csv_single_bracket() {
        let records =
            TaxBracketLoader::parse(csv("2025,X,0,11925,0.10").as_bytes()).expect("Failed to parse CSV");

        assert_eq!(
            records,
            vec![TaxBracketRecord {
                tax_year: 2025,
                schedule: "X".to_string(),
                lower_bound: dec!(0),
                upper_bound: Some(dec!(11925)),
                rate: dec!(0.10),
            }]
        );
    }

    #[test]
    fn test_parse_csv_open_top_bracket() {
        let records =
            TaxBracketLoader::parse(csv("2025,X,626350,,0.37").as_bytes()).expect("Failed to parse CSV");

        assert_eq!(records[0].upper_bound, None);
        assert_eq!(records[0].lower_bound, dec!(626350));
    }

    #[test]
    fn test_parse_invalid_csv_missing_column() {
        let result = TaxBracketLoader::parse("tax_year,schedule,lower_bound\n2025,X,0".as_bytes());

        let err = result.expect_err("Should fail for missing column");
        let TaxBracketLoaderError::CsvParse(msg) = err else {
            panic!("Expected CsvParse error, got: {:?}", err);
        };
        assert!(msg.contains("missing field"), "got: {}", msg);
    }

    #[test]
    fn test_parse_invalid_csv_bad_decimal() {
        let result = TaxBracketLoader::parse(csv("2025,X,abc,11925,0.10").as_bytes());

        assert!(matches!(result, Err(TaxBracketLoaderError::CsvParse(_))));
    }

    #[test]
    fn test_parse_empty_csv() {
        let records = TaxBracketLoader::parse(HEADER.as_bytes()).expect("Failed to parse CSV");

        assert!(records.is_empty());
    }

    #[test]
    fn test_schedule_mapping() {
        use FilingStatusCode::*;

        assert_eq!(schedule_to_filing_statuses("X").unwrap(), &[Single]);
        assert_eq!(
            schedule_to_filing_statuses("Y-1").unwrap(),
            &[MarriedFilingJointly, QualifyingSurvivingSpouse]
        );
        assert_eq!(schedule_to_filing_statuses("Y-2").unwrap(), &[MarriedFilingSeparately]);
        assert_eq!(schedule_to_filing_statuses("Z").unwrap(), &[HeadOfHousehold]);
    }

    #[test]
    fn test_schedule_mapping_invalid() {
        match schedule_to_filing_statuses("INVALID") {
            Err(TaxBracketLoaderError::InvalidSchedule(schedule)) => assert_eq!(schedule, "INVALID"),
            other => panic!("expected InvalidSchedule, got {other:?}"),
        }
    }

    #[test]
    fn test_prepare_sorts_rows_by_lower_bound() {
        let records =
            TaxBracketLoader::parse(csv("2025,X,10000,,0.20\n2025,X,0,10000,0.10").as_bytes())
                .unwrap();

        let tables = TaxBracketLoader::prepare(&records).expect("valid table");

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].brackets[0].lower_bound, dec!(0));
        assert_eq!(tables[0].brackets[1].upper_bound, None);
    }

    #[tokio::test]
    async fn test_gap_in_table_is_rejected_before_writing() {
        let repo = MemoryRepository::with_tax_tables(&calc_core::calculations::tax::TaxTables::builtin());
        let before = repo
            .get_tax_brackets(2025, FilingStatusCode::HeadOfHousehold)
            .await
            .unwrap();
        let records = TaxBracketLoader::parse(
            csv("2025,Z,0,17000,0.10\n2025,Z,17000,,0.12\n2025,X,0,10000,0.10\n2025,X,12000,,0.12")
                .as_bytes(),
        )
        .unwrap();

        let err = TaxBracketLoader::load(&repo, &records).await.unwrap_err();

        match err {
            TaxBracketLoaderError::InvalidTable {
                tax_year,
                schedule,
                source,
            } => {
                assert_eq!(tax_year, 2025);
                assert_eq!(schedule, "X");
                assert_eq!(
                    source,
                    BracketTableError::NotContiguous {
                        index: 1,
                        lower: dec!(12000),
                        expected: dec!(10000),
                    }
                );
            }
            other => panic!("expected InvalidTable, got {other:?}"),
        }
        let after = repo
            .get_tax_brackets(2025, FilingStatusCode::HeadOfHousehold)
            .await
            .unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_unknown_year_maps_to_tax_year_not_found() {
        let repo = MemoryRepository::new();
        let records = TaxBracketLoader::parse(csv("2030,X,0,,0.10").as_bytes()).unwrap();

        let err = TaxBracketLoader::load(&repo, &records).await.unwrap_err();

        assert!(matches!(err, TaxBracketLoaderError::TaxYearNotFound(2030)));
    }
}
