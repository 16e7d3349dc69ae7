//! Tax bracket loading against the SQLite backend.

use calc_core::calculations::tax::{IncomeTaxCalculator, IncomeTaxInput, TaxTables};
use calc_core::{CalculatorRepository, FilingStatusCode, RepositoryError};
use calc_data::{TaxBracketLoader, TaxBracketLoaderError};
use calc_db_sqlite::SqliteRepository;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

const TEST_CSV_2025: &str = include_str!("../test-data/tax_brackets_2025.csv");

/// Migrations only, no seed data.
async fn setup_test_db_without_seeds() -> SqliteRepository {
    let repo = SqliteRepository::new("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    repo.run_migrations()
        .await
        .expect("Failed to run migrations");
    repo
}

/// Migrations plus a 2025 config row and standard deductions, but no brackets.
async fn setup_test_db() -> SqliteRepository {
    let repo = setup_test_db_without_seeds().await;

    sqlx::query(
        "INSERT INTO tax_year_config (
            tax_year, retirement_plan_limit, ira_limit, hsa_limit, student_loan_interest_limit
        ) VALUES (2025, '23500', '7000', '4300', '2500')",
    )
    .execute(repo.pool())
    .await
    .expect("Failed to insert tax year config");

    sqlx::query(
        "INSERT INTO standard_deductions (tax_year, filing_status, amount) VALUES
         (2025, 'S', '15750'),
         (2025, 'MFJ', '31500'),
         (2025, 'MFS', '15750'),
         (2025, 'HOH', '23625'),
         (2025, 'QSS', '31500')",
    )
    .execute(repo.pool())
    .await
    .expect("Failed to insert standard deductions");

    repo
}

async fn load_2025(repo: &SqliteRepository) -> usize {
    let records = TaxBracketLoader::parse(TEST_CSV_2025.as_bytes()).expect("Failed to parse CSV");
    TaxBracketLoader::load(repo, &records)
        .await
        .expect("Failed to load brackets")
}

#[tokio::test]
async fn test_load_all_2025_brackets() {
    let repo = setup_test_db().await;

    // 28 rows in the CSV; Y-1 is written for both MFJ and QSS.
    assert_eq!(load_2025(&repo).await, 35);
}

#[tokio::test]
async fn test_load_and_retrieve_single_brackets() {
    let repo = setup_test_db().await;
    load_2025(&repo).await;

    let brackets = repo
        .get_tax_brackets(2025, FilingStatusCode::Single)
        .await
        .expect("Failed to get Single brackets");

    assert_eq!(brackets.len(), 7);
    assert_eq!(brackets[0].lower_bound, dec!(0));
    assert_eq!(brackets[0].upper_bound, Some(dec!(11925)));
    assert_eq!(brackets[0].rate, dec!(0.10));
    assert_eq!(brackets[6].lower_bound, dec!(626350));
    assert_eq!(brackets[6].upper_bound, None);
    assert_eq!(brackets[6].rate, dec!(0.37));
}

#[tokio::test]
async fn test_qss_mirrors_mfj() {
    let repo = setup_test_db().await;
    load_2025(&repo).await;

    let mfj = repo
        .get_tax_brackets(2025, FilingStatusCode::MarriedFilingJointly)
        .await
        .unwrap();
    let qss = repo
        .get_tax_brackets(2025, FilingStatusCode::QualifyingSurvivingSpouse)
        .await
        .unwrap();

    assert_eq!(mfj.len(), 7);
    for (joint, survivor) in mfj.iter().zip(&qss) {
        assert_eq!(survivor.filing_status, FilingStatusCode::QualifyingSurvivingSpouse);
        assert_eq!(
            (survivor.lower_bound, survivor.upper_bound, survivor.rate),
            (joint.lower_bound, joint.upper_bound, joint.rate)
        );
    }
}

#[tokio::test]
async fn test_mfs_top_bracket_differs_from_single() {
    let repo = setup_test_db().await;
    load_2025(&repo).await;

    let brackets = repo
        .get_tax_brackets(2025, FilingStatusCode::MarriedFilingSeparately)
        .await
        .unwrap();

    let bracket_35 = brackets.iter().find(|b| b.rate == dec!(0.35)).unwrap();
    assert_eq!(bracket_35.upper_bound, Some(dec!(375800)));
    assert_eq!(brackets[6].lower_bound, dec!(375800));
}

#[tokio::test]
async fn test_loading_twice_is_idempotent() {
    let repo = setup_test_db().await;
    load_2025(&repo).await;
    load_2025(&repo).await;

    let brackets = repo
        .get_tax_brackets(2025, FilingStatusCode::HeadOfHousehold)
        .await
        .unwrap();

    assert_eq!(brackets.len(), 7);
}

#[tokio::test]
async fn test_loaded_tables_match_builtin_and_drive_the_calculator() {
    let repo = setup_test_db().await;
    load_2025(&repo).await;

    let loaded = TaxTables::load(&repo, 2025).await.expect("table loads");
    let builtin = TaxTables::builtin();
    assert_eq!(&loaded, builtin.get(2025).unwrap());

    let mut tables = TaxTables::new();
    tables.insert(loaded);
    let result = IncomeTaxCalculator::new(&tables)
        .calculate(&IncomeTaxInput {
            tax_year: 2025,
            filing_status: FilingStatusCode::Single,
            wages: dec!(65750),
            other_income: dec!(0),
            adjustments: Default::default(),
            itemized_deductions: dec!(0),
            credits: dec!(0),
            withholding: dec!(0),
        })
        .expect("tax calculates");
    assert_eq!(result.taxable_income, dec!(50000));
}

#[tokio::test]
async fn test_load_without_tax_year_config_fails() {
    let repo = setup_test_db_without_seeds().await;
    let records = TaxBracketLoader::parse(TEST_CSV_2025.as_bytes()).unwrap();

    let err = TaxBracketLoader::load(&repo, &records).await.unwrap_err();

    assert!(
        matches!(err, TaxBracketLoaderError::TaxYearNotFound(2025)),
        "got {err:?}"
    );
    assert_eq!(
        repo.get_tax_brackets(2025, FilingStatusCode::Single).await,
        Ok(Vec::new())
    );
}

#[tokio::test]
async fn test_invalid_schedule_is_rejected() {
    let repo = setup_test_db().await;
    let records = TaxBracketLoader::parse(
        "tax_year,schedule,lower_bound,upper_bound,rate\n2025,W,0,,0.10\n".as_bytes(),
    )
    .unwrap();

    let err = TaxBracketLoader::load(&repo, &records).await.unwrap_err();

    assert!(matches!(err, TaxBracketLoaderError::InvalidSchedule(s) if s == "W"));
}

#[tokio::test]
async fn test_repository_error_passes_through_for_closed_pool() {
    let repo = setup_test_db().await;
    repo.pool().close().await;
    let records = TaxBracketLoader::parse(TEST_CSV_2025.as_bytes()).unwrap();

    let err = TaxBracketLoader::load(&repo, &records).await.unwrap_err();

    assert!(matches!(
        err,
        TaxBracketLoaderError::Repository(RepositoryError::Database(_))
    ));
}
