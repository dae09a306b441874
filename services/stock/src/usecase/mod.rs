pub mod audit;
pub mod catalog;
pub mod consume;
pub mod inventory;
pub mod key;
