pub mod ledger;
pub mod repository;
pub mod types;
