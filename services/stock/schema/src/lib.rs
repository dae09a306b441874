//! sea-orm entities for the stock service tables.

pub mod access_keys;
pub mod audit_entries;
pub mod products;
pub mod stock_items;
