use crate::error::Error;
use crate::model::Service;
use std::fmt;

/// What a scan runs over: a project, a service and, for databases, an
/// optional database/collection narrowing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanScope {
    pub project_id: String,
    pub service: Service,
    pub database_id: Option<String>,
    pub collection_id: Option<String>,
}

impl ScanScope {
    pub fn new(project_id: impl Into<String>, service: Service) -> Self {
        Self {
            project_id: project_id.into(),
            service,
            database_id: None,
            collection_id: None,
        }
    }

    pub fn with_database(mut self, database_id: impl Into<String>) -> Self {
        self.database_id = Some(database_id.into());
        self
    }

    pub fn with_collection(mut self, collection_id: impl Into<String>) -> Self {
        self.collection_id = Some(collection_id.into());
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.project_id.trim().is_empty() {
            return Err(Error::InvalidScope("project id is required".to_string()));
        }
        let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        match self.service {
            Service::Storage => {
                if has(&self.database_id) || has(&self.collection_id) {
                    return Err(Error::InvalidScope(
                        "database and collection only apply to database scans".to_string(),
                    ));
                }
            }
            Service::Database => {
                if has(&self.collection_id) && !has(&self.database_id) {
                    return Err(Error::InvalidScope(
                        "a collection requires its database id".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Database/collection suffix used in activity messages, e.g. ` database db1 collection c1`.
    pub fn qualifiers(&self) -> String {
        let mut out = String::new();
        if let Some(db) = &self.database_id {
            out.push_str(&format!(" database {}", db));
        }
        if let Some(col) = &self.collection_id {
            out.push_str(&format!(" collection {}", col));
        }
        out
    }
}

impl fmt::Display for ScanScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project_id, self.service)?;
        if let Some(db) = &self.database_id {
            write!(f, "/{}", db)?;
        }
        if let Some(col) = &self.collection_id {
            write!(f, "/{}", col)?;
        }
        Ok(())
    }
}
