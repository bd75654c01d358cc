pub mod database;
pub mod vault_store;
