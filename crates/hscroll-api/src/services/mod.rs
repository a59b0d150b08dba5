//! API services.

pub mod rate_limit;
pub mod verdict;

pub use rate_limit::{BudgetSnapshot, DailyBudget};
pub use verdict::VerdictService;
