use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Employee {
    pub id: Uuid,
    pub department_id: Uuid,
    pub full_name: String,
    pub position: String,
    pub hired_at: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Validate, Debug, Clone)]
pub struct NewEmployee {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub full_name: String,
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub position: String,
    #[serde(default)]
    pub hired_at: Option<NaiveDate>,
}

impl NewEmployee {
    pub fn trimmed(self) -> Self {
        NewEmployee {
            full_name: self.full_name.trim().to_string(),
            position: self.position.trim().to_string(),
            hired_at: self.hired_at,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeSort {
    #[default]
    CreatedAt,
    FullName,
}

impl EmployeeSort {
    pub fn sort(self, employees: &mut [Employee]) {
        match self {
            EmployeeSort::CreatedAt => employees.sort_by(|a, b| {
                a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))
            }),
            EmployeeSort::FullName => employees.sort_by(|a, b| {
                a.full_name.cmp(&b.full_name).then_with(|| a.id.cmp(&b.id))
            }),
        }
    }

    /// `ORDER BY` clause matching [`EmployeeSort::sort`]. Names compare by
    /// code point (`COLLATE "C"`), as Rust strings do.
    pub fn order_by(self) -> &'static str {
        match self {
            EmployeeSort::CreatedAt => "created_at ASC, id ASC",
            EmployeeSort::FullName => "full_name COLLATE \"C\" ASC, id ASC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(full_name: &str) -> Employee {
        Employee {
            id: Uuid::new_v4(),
            department_id: Uuid::nil(),
            full_name: full_name.to_string(),
            position: "Engineer".to_string(),
            hired_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn full_name_sort_uses_code_point_order() {
        let mut employees: Vec<Employee> =
            ["bob", "Zed", "alice", "Alice", "Émile"].into_iter().map(named).collect();
        EmployeeSort::FullName.sort(&mut employees);

        let names: Vec<&str> = employees.iter().map(|e| e.full_name.as_str()).collect();
        assert_eq!(names, ["Alice", "Zed", "alice", "bob", "Émile"]);
        assert_eq!(
            EmployeeSort::FullName.order_by(),
            "full_name COLLATE \"C\" ASC, id ASC"
        );
    }
}
