pub mod journal;
pub mod sqlite;

pub use journal::JournalSink;
pub use sqlite::Database;
