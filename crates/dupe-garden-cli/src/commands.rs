use clap::{Args, Parser, Subcommand};
use dupe_garden_core::{ScanScope, Service, SortKey};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "dupe-garden")]
#[command(about = "Review and clean up duplicates found in your project", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Which slice of a project to scan.
#[derive(Debug, Args)]
pub struct ScopeArgs {
    #[arg(long)]
    pub project: String,
    /// database or storage
    #[arg(long)]
    pub service: Service,
    #[arg(long)]
    pub database: Option<String>,
    #[arg(long, requires = "database")]
    pub collection: Option<String>,
}

impl ScopeArgs {
    pub fn to_scope(&self) -> ScanScope {
        let mut scope = ScanScope::new(self.project.clone(), self.service);
        if let Some(database) = &self.database {
            scope = scope.with_database(database.clone());
        }
        if let Some(collection) = &self.collection {
            scope = scope.with_collection(collection.clone());
        }
        scope
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the databases and storage buckets of a project
    Resources {
        #[arg(long)]
        project: String,
    },
    /// List the collections of one database
    Collections {
        #[arg(long)]
        project: String,
        #[arg(long)]
        database: String,
    },
    /// Scan for duplicates and print them with summary statistics
    Scan {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Only show records whose name, id or type contains this text
        #[arg(long, default_value = "")]
        search: String,
        /// name, similarity, type or service
        #[arg(long, default_value = "name")]
        sort: SortKey,
        /// Write the listing to this CSV file instead of the terminal
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Scan, then delete every duplicate that matches the search
    Clean {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, default_value = "")]
        search: String,
        /// Also delete the underlying document or file
        #[arg(long)]
        delete_source: bool,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show, delete or clear activity recorded by the backend
    Activities {
        /// Delete the activity with this id
        #[arg(long, conflicts_with = "clear")]
        delete: Option<String>,
        /// Delete all of your activities
        #[arg(long)]
        clear: bool,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show, delete or clear activity in the local journal
    History {
        #[arg(long, default_value_t = 20)]
        limit: i64,
        /// Delete the journal entry with this id
        #[arg(long, conflicts_with = "clear")]
        delete: Option<i64>,
        /// Delete all of your journal entries
        #[arg(long)]
        clear: bool,
        #[arg(long)]
        yes: bool,
    },
    /// Print configuration values
    PrintConfig,
}
