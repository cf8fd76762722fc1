pub mod db;
pub mod error;
pub mod event_log;
pub mod schema;
pub mod store;

pub use error::{Result, StorageError};
pub use event_log::EventLog;
pub use store::{MessageFilter, Pagination, Store};
