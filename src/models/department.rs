use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::models::employee::{Employee, EmployeeSort};

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NewDepartment {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

/// Partial update. `parent_id` distinguishes a missing key (keep the current
/// parent) from an explicit `null` (move to root).
#[derive(Deserialize, Debug, Clone, Default)]
pub struct DepartmentUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub parent_id: Option<Option<Uuid>>,
}

fn deserialize_some<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    Cascade,
    Reassign,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DeleteDepartment {
    pub mode: DeleteMode,
    #[serde(default)]
    pub reassign_to_department_id: Option<Uuid>,
}

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionSummary {
    pub departments_removed: u64,
    pub employees_removed: u64,
    pub employees_reassigned: u64,
    pub children_reassigned: u64,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct TreeQuery {
    #[serde(default = "default_depth")]
    pub depth: u8,
    #[serde(default = "default_include_employees")]
    pub include_employees: bool,
    #[serde(default)]
    pub sort_employees: EmployeeSort,
}

fn default_depth() -> u8 {
    1
}

fn default_include_employees() -> bool {
    true
}

impl Default for TreeQuery {
    fn default() -> Self {
        TreeQuery {
            depth: default_depth(),
            include_employees: default_include_employees(),
            sort_employees: EmployeeSort::default(),
        }
    }
}

/// A department with its materialized part of the subtree. Fields beyond the
/// requested depth, or employees that were not requested, are `None`.
#[derive(Serialize, Debug, Clone)]
pub struct DepartmentNode {
    pub department: Department,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employees: Option<Vec<Employee>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<DepartmentNode>>,
}
