use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{EntityStore, StoreTx};
use crate::errors::{AppError, AppResult};
use crate::models::{Department, DepartmentNode, Employee, TreeQuery};
use crate::services::rejected;

/// Bounded-depth reads of a department and its descendants.
pub struct TreeReader<S: EntityStore> {
    store: Arc<S>,
    max_depth: u8,
}

impl<S: EntityStore> Clone for TreeReader<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            max_depth: self.max_depth,
        }
    }
}

struct Slot {
    department: Department,
    employees: Option<Vec<Employee>>,
    children: Option<Vec<usize>>,
}

impl<S: EntityStore> TreeReader<S> {
    pub fn new(store: Arc<S>, max_depth: u8) -> Self {
        Self { store, max_depth }
    }

    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    pub async fn get_department(&self, id: Uuid) -> AppResult<Department> {
        let mut tx = self.store.snapshot().await?;
        tx.get_department(id).await
    }

    /// Returns the department plus `query.depth - 1` levels below it. Nodes on
    /// the last level have `children: None`.
    pub async fn get_department_tree(
        &self,
        id: Uuid,
        query: TreeQuery,
    ) -> AppResult<DepartmentNode> {
        self.read_tree(id, query)
            .await
            .map_err(|err| rejected("Read tree of department", format!("id={}", id), err))
    }

    async fn read_tree(&self, id: Uuid, query: TreeQuery) -> AppResult<DepartmentNode> {
        if !(1..=self.max_depth).contains(&query.depth) {
            return Err(AppError::validation(
                "depth",
                format!("must be between 1 and {}", self.max_depth),
            ));
        }

        let mut tx = self.store.snapshot().await?;
        let root = tx.get_department(id).await?;

        let mut slots = vec![Slot {
            department: root,
            employees: None,
            children: None,
        }];
        let mut seen = HashSet::from([id]);
        let mut queue = VecDeque::from([(0usize, 1u8)]);

        while let Some((index, level)) = queue.pop_front() {
            let department_id = slots[index].department.id;

            if query.include_employees {
                let employees = tx
                    .list_employees_by_department(department_id, query.sort_employees)
                    .await?;
                slots[index].employees = Some(employees);
            }

            if level >= query.depth {
                continue;
            }

            let mut child_slots = Vec::new();
            for child in tx.list_children(department_id).await? {
                if !seen.insert(child.id) {
                    return Err(AppError::Internal(format!(
                        "department {} visited twice while reading tree of {}",
                        child.id, id
                    )));
                }
                child_slots.push(slots.len());
                queue.push_back((slots.len(), level + 1));
                slots.push(Slot {
                    department: child,
                    employees: None,
                    children: None,
                });
            }
            slots[index].children = Some(child_slots);
        }

        let mut slots: Vec<Option<Slot>> = slots.into_iter().map(Some).collect();
        assemble(&mut slots, 0)
    }
}

fn assemble(slots: &mut [Option<Slot>], index: usize) -> AppResult<DepartmentNode> {
    let slot = slots[index]
        .take()
        .ok_or_else(|| AppError::Internal(format!("tree slot {} assembled twice", index)))?;

    let children = match slot.children {
        Some(indices) => Some(
            indices
                .into_iter()
                .map(|child| assemble(slots, child))
                .collect::<AppResult<Vec<_>>>()?,
        ),
        None => None,
    };

    Ok(DepartmentNode {
        department: slot.department,
        employees: slot.employees,
        children,
    })
}
