pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::collections::HashSet;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{Department, Employee, EmployeeSort};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Rows removed by [`StoreTx::delete_subtree_cascade`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubtreeRemoval {
    pub departments: u64,
    pub employees: u64,
}

/// Owner of all persisted departments and employees.
///
/// Every unit of work runs inside a [`StoreTx`]. Write transactions are
/// serialized against each other; snapshots see a consistent view and are never
/// committed.
#[async_trait]
pub trait EntityStore: Send + Sync + 'static {
    type Tx: StoreTx;

    async fn begin(&self) -> AppResult<Self::Tx>;

    async fn snapshot(&self) -> AppResult<Self::Tx>;
}

/// Persistence primitives. Dropping a transaction without calling
/// [`StoreTx::commit`] discards its writes.
#[async_trait]
pub trait StoreTx: Send {
    async fn find_department(&mut self, id: Uuid) -> AppResult<Option<Department>>;

    async fn get_department(&mut self, id: Uuid) -> AppResult<Department> {
        self.find_department(id)
            .await?
            .ok_or_else(|| AppError::not_found("department", id))
    }

    async fn insert_department(&mut self, department: &Department) -> AppResult<()>;

    /// Writes `name` and `parent_id`; `created_at` is never touched.
    async fn update_department(&mut self, department: &Department) -> AppResult<()>;

    async fn delete_department(&mut self, id: Uuid) -> AppResult<()>;

    /// Departments whose parent is `parent_id`, ordered by name then id.
    async fn list_departments_by_parent(
        &mut self,
        parent_id: Option<Uuid>,
    ) -> AppResult<Vec<Department>>;

    async fn list_children(&mut self, parent_id: Uuid) -> AppResult<Vec<Department>> {
        self.list_departments_by_parent(Some(parent_id)).await
    }

    async fn count_departments(&mut self) -> AppResult<u64>;

    async fn find_employee(&mut self, id: Uuid) -> AppResult<Option<Employee>>;

    async fn get_employee(&mut self, id: Uuid) -> AppResult<Employee> {
        self.find_employee(id)
            .await?
            .ok_or_else(|| AppError::not_found("employee", id))
    }

    async fn insert_employee(&mut self, employee: &Employee) -> AppResult<()>;

    async fn list_employees_by_department(
        &mut self,
        department_id: Uuid,
        sort: EmployeeSort,
    ) -> AppResult<Vec<Employee>>;

    /// Moves every employee of `from` to `to`, returning how many moved.
    async fn reassign_employees(&mut self, from: Uuid, to: Uuid) -> AppResult<u64>;

    /// Re-parents every direct child of `from` under `to`.
    async fn reassign_children(&mut self, from: Uuid, to: Uuid) -> AppResult<u64>;

    /// Deletes `root`, all of its descendants and every employee attached to
    /// any of them.
    async fn delete_subtree_cascade(&mut self, root: Uuid) -> AppResult<SubtreeRemoval>;

    async fn commit(self) -> AppResult<()>;
}

/// Ids of `root` and all of its descendants, `root` first.
///
/// Iterative walk over `list_children`; a node reached twice means the stored
/// parent links are corrupt.
pub async fn collect_subtree_ids<T: StoreTx>(tx: &mut T, root: Uuid) -> AppResult<Vec<Uuid>> {
    tx.get_department(root).await?;

    let mut seen = HashSet::from([root]);
    let mut ids = vec![root];
    let mut stack = vec![root];

    while let Some(current) = stack.pop() {
        for child in tx.list_children(current).await? {
            if !seen.insert(child.id) {
                return Err(AppError::Internal(format!(
                    "department {} reached twice while walking subtree of {}",
                    child.id, root
                )));
            }
            ids.push(child.id);
            stack.push(child.id);
        }
    }

    Ok(ids)
}
