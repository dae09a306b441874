pub mod admin;
pub mod consume;
pub mod inventory;
pub mod key;
