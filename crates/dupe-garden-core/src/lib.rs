pub mod activity;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod mutation;
pub mod orchestrator;
pub mod payload;
pub mod progress;
pub mod scope;
pub mod selection;
pub mod session;
pub mod stats;
pub mod storage;
pub mod view;

pub use config::AppConfig;
pub use error::Error;
pub use model::{DuplicateRecord, Service};
pub use mutation::DeleteOutcome;
pub use progress::{ProgressReporter, SilentReporter};
pub use scope::ScanScope;
pub use session::{DashboardSession, ScanOutcome};
pub use view::{SortKey, ViewQuery};
