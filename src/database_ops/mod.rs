pub mod igdb;
pub mod postgres;
pub mod store;

pub use postgres::PgCatalogStore;
pub use store::{DimensionStore, GameStore, UpsertOutcome};
