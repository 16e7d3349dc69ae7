pub mod calculations;
pub mod db;
pub mod models;
pub mod share;

pub use calculations::{CalculatorError, CalculatorInput, CalculatorResult, calculate};
pub use db::repository::{CalculatorRepository, RepositoryError};
pub use models::*;
