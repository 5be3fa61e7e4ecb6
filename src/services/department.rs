use chrono::Utc;
use log::{debug, info};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{EntityStore, StoreTx};
use crate::errors::{AppError, AppResult};
use crate::models::{
    DeleteDepartment, DeleteMode, DeletionSummary, Department, DepartmentUpdate, NewDepartment,
};
use crate::services::{guard, rejected};

/// Create, rename, move and delete departments. Every operation runs in a
/// single store transaction; a failed check commits nothing.
pub struct DepartmentService<S: EntityStore> {
    store: Arc<S>,
}

impl<S: EntityStore> Clone for DepartmentService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: EntityStore> DepartmentService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn create_department(&self, input: NewDepartment) -> AppResult<Department> {
        let target = format!("name={:?} parent_id={:?}", input.name.trim(), input.parent_id);
        self.create(input)
            .await
            .map_err(|err| rejected("Create department", target, err))
    }

    async fn create(&self, input: NewDepartment) -> AppResult<Department> {
        let name = guard::validate_name("name", &input.name)?;

        let mut tx = self.store.begin().await?;
        if let Some(parent_id) = input.parent_id {
            tx.get_department(parent_id).await?;
        }
        guard::check_sibling_uniqueness(&mut tx, input.parent_id, &name, None).await?;

        let department = Department {
            id: Uuid::new_v4(),
            name,
            parent_id: input.parent_id,
            created_at: Utc::now(),
        };
        tx.insert_department(&department).await?;
        tx.commit().await?;

        info!(
            "Created department id={} name={}",
            department.id, department.name
        );
        Ok(department)
    }

    pub async fn update_department(
        &self,
        id: Uuid,
        update: DepartmentUpdate,
    ) -> AppResult<Department> {
        self.update(id, update)
            .await
            .map_err(|err| rejected("Update department", format!("id={}", id), err))
    }

    async fn update(&self, id: Uuid, update: DepartmentUpdate) -> AppResult<Department> {
        let new_name = update
            .name
            .as_deref()
            .map(|raw| guard::validate_name("name", raw))
            .transpose()?;

        let mut tx = self.store.begin().await?;
        let mut department = tx.get_department(id).await?;

        if let Some(Some(parent_id)) = update.parent_id {
            guard::check_no_cycle(&mut tx, id, parent_id).await?;
        }

        let name = new_name.unwrap_or_else(|| department.name.clone());
        let parent_id = update.parent_id.unwrap_or(department.parent_id);

        if name == department.name && parent_id == department.parent_id {
            debug!("Update of department id={} changes nothing", id);
            return Ok(department);
        }

        guard::check_sibling_uniqueness(&mut tx, parent_id, &name, Some(id)).await?;

        department.name = name;
        department.parent_id = parent_id;
        tx.update_department(&department).await?;
        tx.commit().await?;

        info!(
            "Updated department id={} name={} parent_id={:?}",
            department.id, department.name, department.parent_id
        );
        Ok(department)
    }

    pub async fn delete_department(
        &self,
        id: Uuid,
        request: DeleteDepartment,
    ) -> AppResult<DeletionSummary> {
        let result = match request.mode {
            DeleteMode::Cascade => self.delete_cascade(id).await,
            DeleteMode::Reassign => match request.reassign_to_department_id {
                Some(target) => self.delete_reassign(id, target).await,
                None => Err(AppError::validation(
                    "reassign_to_department_id",
                    "is required when mode=reassign",
                )),
            },
        };
        result.map_err(|err| rejected("Delete department", format!("id={}", id), err))
    }

    async fn delete_cascade(&self, id: Uuid) -> AppResult<DeletionSummary> {
        let mut tx = self.store.begin().await?;
        let removed = tx.delete_subtree_cascade(id).await?;
        tx.commit().await?;

        info!(
            "Deleted department id={} (cascade: {} departments, {} employees)",
            id, removed.departments, removed.employees
        );
        Ok(DeletionSummary {
            departments_removed: removed.departments,
            employees_removed: removed.employees,
            ..DeletionSummary::default()
        })
    }

    async fn delete_reassign(&self, id: Uuid, target: Uuid) -> AppResult<DeletionSummary> {
        let mut tx = self.store.begin().await?;
        tx.get_department(id).await?;

        // Target must survive the delete: not the node, not below it.
        guard::check_no_cycle(&mut tx, id, target).await?;

        let children = tx.list_children(id).await?;
        guard::check_adoption(&mut tx, target, id, &children).await?;

        let employees_reassigned = tx.reassign_employees(id, target).await?;
        let children_reassigned = tx.reassign_children(id, target).await?;
        tx.delete_department(id).await?;
        tx.commit().await?;

        info!(
            "Deleted department id={} (reassign to {}: {} employees, {} children)",
            id, target, employees_reassigned, children_reassigned
        );
        Ok(DeletionSummary {
            departments_removed: 1,
            employees_removed: 0,
            employees_reassigned,
            children_reassigned,
        })
    }
}
