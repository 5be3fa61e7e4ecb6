pub mod department;
pub mod employee;
pub mod guard;
pub mod tree;

use log::{debug, error, warn};
use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::db::EntityStore;
use crate::errors::AppError;

pub use department::DepartmentService;
pub use employee::EmployeeRegistrar;
pub use tree::TreeReader;

/// Everything the HTTP layer calls into, sharing one store handle.
pub struct OrgServices<S: EntityStore> {
    pub departments: DepartmentService<S>,
    pub tree: TreeReader<S>,
    pub employees: EmployeeRegistrar<S>,
}

impl<S: EntityStore> Clone for OrgServices<S> {
    fn clone(&self) -> Self {
        Self {
            departments: self.departments.clone(),
            tree: self.tree.clone(),
            employees: self.employees.clone(),
        }
    }
}

impl<S: EntityStore> OrgServices<S> {
    pub fn new(store: Arc<S>, config: &Config) -> Self {
        Self {
            departments: DepartmentService::new(store.clone()),
            tree: TreeReader::new(store.clone(), config.max_tree_depth),
            employees: EmployeeRegistrar::new(store),
        }
    }
}

/// Logs a failed operation and hands the error back. Conflicts are `warn`,
/// caller mistakes `debug`, store failures `error`.
pub(crate) fn rejected(operation: &str, target: impl fmt::Display, err: AppError) -> AppError {
    match &err {
        AppError::Conflict(_) => warn!("{} {} rejected: {}", operation, target, err),
        AppError::Validation { .. } | AppError::NotFound { .. } => {
            debug!("{} {} rejected: {}", operation, target, err)
        }
        AppError::Internal(_) | AppError::DatabaseError(_) => {
            error!("{} {} failed: {}", operation, target, err)
        }
    }
    err
}
