use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use uuid::Uuid;

use crate::db::{collect_subtree_ids, EntityStore, StoreTx, SubtreeRemoval};
use crate::errors::{AppError, AppResult};
use crate::models::{Department, Employee, EmployeeSort};

#[derive(Debug, Default, Clone)]
struct Tables {
    departments: BTreeMap<Uuid, Department>,
    employees: BTreeMap<Uuid, Employee>,
}

/// Process-local store. Writers hold the table lock for the whole transaction
/// and work on a private copy that replaces the shared tables on commit.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct MemoryTx {
    working: Tables,
    guard: Option<OwnedRwLockWriteGuard<Tables>>,
}

#[async_trait]
impl EntityStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> AppResult<MemoryTx> {
        let guard = self.tables.clone().write_owned().await;
        Ok(MemoryTx {
            working: (*guard).clone(),
            guard: Some(guard),
        })
    }

    async fn snapshot(&self) -> AppResult<MemoryTx> {
        let tables = self.tables.read().await;
        Ok(MemoryTx {
            working: (*tables).clone(),
            guard: None,
        })
    }
}

impl MemoryTx {
    fn require_department(&self, id: Uuid) -> AppResult<()> {
        if self.working.departments.contains_key(&id) {
            Ok(())
        } else {
            Err(AppError::not_found("department", id))
        }
    }

    fn sibling_name_taken(&self, department: &Department) -> bool {
        self.working.departments.values().any(|d| {
            d.id != department.id && d.parent_id == department.parent_id && d.name == department.name
        })
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn find_department(&mut self, id: Uuid) -> AppResult<Option<Department>> {
        Ok(self.working.departments.get(&id).cloned())
    }

    async fn insert_department(&mut self, department: &Department) -> AppResult<()> {
        if let Some(parent_id) = department.parent_id {
            self.require_department(parent_id)?;
        }
        if self.working.departments.contains_key(&department.id) {
            return Err(AppError::Conflict(format!(
                "department {} already exists",
                department.id
            )));
        }
        // Same guarantee the unique indexes give the Postgres store.
        if self.sibling_name_taken(department) {
            return Err(AppError::Conflict(format!(
                "department {:?} already exists under this parent",
                department.name
            )));
        }
        self.working
            .departments
            .insert(department.id, department.clone());
        Ok(())
    }

    async fn update_department(&mut self, department: &Department) -> AppResult<()> {
        if let Some(parent_id) = department.parent_id {
            self.require_department(parent_id)?;
        }
        if self.sibling_name_taken(department) {
            return Err(AppError::Conflict(format!(
                "department {:?} already exists under this parent",
                department.name
            )));
        }
        let stored = self
            .working
            .departments
            .get_mut(&department.id)
            .ok_or_else(|| AppError::not_found("department", department.id))?;
        stored.name = department.name.clone();
        stored.parent_id = department.parent_id;
        Ok(())
    }

    async fn delete_department(&mut self, id: Uuid) -> AppResult<()> {
        self.require_department(id)?;
        let referenced = self.working.departments.values().any(|d| d.parent_id == Some(id))
            || self.working.employees.values().any(|e| e.department_id == id);
        if referenced {
            return Err(AppError::Conflict(format!(
                "department {} still has children or employees",
                id
            )));
        }
        self.working.departments.remove(&id);
        Ok(())
    }

    async fn list_departments_by_parent(
        &mut self,
        parent_id: Option<Uuid>,
    ) -> AppResult<Vec<Department>> {
        if let Some(parent_id) = parent_id {
            self.require_department(parent_id)?;
        }
        let mut children: Vec<Department> = self
            .working
            .departments
            .values()
            .filter(|d| d.parent_id == parent_id)
            .cloned()
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(children)
    }

    async fn count_departments(&mut self) -> AppResult<u64> {
        Ok(self.working.departments.len() as u64)
    }

    async fn find_employee(&mut self, id: Uuid) -> AppResult<Option<Employee>> {
        Ok(self.working.employees.get(&id).cloned())
    }

    async fn insert_employee(&mut self, employee: &Employee) -> AppResult<()> {
        self.require_department(employee.department_id)?;
        if self.working.employees.contains_key(&employee.id) {
            return Err(AppError::Conflict(format!(
                "employee {} already exists",
                employee.id
            )));
        }
        self.working.employees.insert(employee.id, employee.clone());
        Ok(())
    }

    async fn list_employees_by_department(
        &mut self,
        department_id: Uuid,
        sort: EmployeeSort,
    ) -> AppResult<Vec<Employee>> {
        self.require_department(department_id)?;
        let mut employees: Vec<Employee> = self
            .working
            .employees
            .values()
            .filter(|e| e.department_id == department_id)
            .cloned()
            .collect();
        sort.sort(&mut employees);
        Ok(employees)
    }

    async fn reassign_employees(&mut self, from: Uuid, to: Uuid) -> AppResult<u64> {
        self.require_department(from)?;
        self.require_department(to)?;
        let mut moved = 0;
        for employee in self.working.employees.values_mut() {
            if employee.department_id == from {
                employee.department_id = to;
                moved += 1;
            }
        }
        Ok(moved)
    }

    async fn reassign_children(&mut self, from: Uuid, to: Uuid) -> AppResult<u64> {
        self.require_department(from)?;
        self.require_department(to)?;
        let mut moved = 0;
        for department in self.working.departments.values_mut() {
            if department.parent_id == Some(from) {
                department.parent_id = Some(to);
                moved += 1;
            }
        }
        Ok(moved)
    }

    async fn delete_subtree_cascade(&mut self, root: Uuid) -> AppResult<SubtreeRemoval> {
        let ids: HashSet<Uuid> = collect_subtree_ids(self, root).await?.into_iter().collect();

        let employees_before = self.working.employees.len();
        self.working
            .employees
            .retain(|_, e| !ids.contains(&e.department_id));
        let departments_before = self.working.departments.len();
        self.working.departments.retain(|id, _| !ids.contains(id));

        Ok(SubtreeRemoval {
            departments: (departments_before - self.working.departments.len()) as u64,
            employees: (employees_before - self.working.employees.len()) as u64,
        })
    }

    async fn commit(self) -> AppResult<()> {
        match self.guard {
            Some(mut guard) => {
                *guard = self.working;
                Ok(())
            }
            None => Err(AppError::Internal(
                "cannot commit a read-only snapshot".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn department(name: &str, parent_id: Option<Uuid>) -> Department {
        Department {
            id: Uuid::new_v4(),
            name: name.to_string(),
            parent_id,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let store = MemoryStore::new();
        let root = department("Root", None);

        let mut tx = store.begin().await.unwrap();
        tx.insert_department(&root).await.unwrap();
        drop(tx);

        let mut snapshot = store.snapshot().await.unwrap();
        assert!(snapshot.find_department(root.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn committed_transaction_is_visible() {
        let store = MemoryStore::new();
        let root = department("Root", None);

        let mut tx = store.begin().await.unwrap();
        tx.insert_department(&root).await.unwrap();
        tx.commit().await.unwrap();

        let mut snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.get_department(root.id).await.unwrap(), root);
    }

    #[tokio::test]
    async fn snapshot_cannot_commit() {
        let store = MemoryStore::new();
        let snapshot = store.snapshot().await.unwrap();
        assert!(matches!(
            snapshot.commit().await,
            Err(AppError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn primitives_reject_unknown_ids() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let missing = Uuid::new_v4();

        assert!(matches!(
            tx.get_department(missing).await,
            Err(AppError::NotFound { .. })
        ));
        assert!(matches!(
            tx.delete_department(missing).await,
            Err(AppError::NotFound { .. })
        ));
        assert!(matches!(
            tx.list_children(missing).await,
            Err(AppError::NotFound { .. })
        ));
        assert!(matches!(
            tx.insert_department(&department("Orphan", Some(missing))).await,
            Err(AppError::NotFound { .. })
        ));
        assert!(matches!(
            tx.delete_subtree_cascade(missing).await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn children_are_listed_by_name() {
        let store = MemoryStore::new();
        let root = department("Root", None);
        let mut tx = store.begin().await.unwrap();
        tx.insert_department(&root).await.unwrap();
        for name in ["Sales", "Engineering", "Marketing"] {
            tx.insert_department(&department(name, Some(root.id)))
                .await
                .unwrap();
        }

        let names: Vec<String> = tx
            .list_children(root.id)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, ["Engineering", "Marketing", "Sales"]);
    }
}
