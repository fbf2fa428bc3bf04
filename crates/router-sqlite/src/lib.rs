mod open;
mod error;
mod models;
mod insert;
mod query;
mod scan;
mod schema;
mod ledger;
mod runner;

pub use open::Db;
pub use error::*;
pub use models::*;
pub use insert::*;
pub use scan::*;
pub use ledger::*;
pub use runner::*;
