pub mod application;
pub mod domain;
pub mod storage;

pub use application::{LedgerConfig, LedgerError, LedgerService};
pub use domain::*;
