use chrono::Utc;
use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{EntityStore, StoreTx};
use crate::errors::AppResult;
use crate::models::{Employee, NewEmployee};
use crate::services::rejected;
use crate::utils::validation::validate_payload;

pub struct EmployeeRegistrar<S: EntityStore> {
    store: Arc<S>,
}

impl<S: EntityStore> Clone for EmployeeRegistrar<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: EntityStore> EmployeeRegistrar<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn create_employee(
        &self,
        department_id: Uuid,
        input: NewEmployee,
    ) -> AppResult<Employee> {
        self.register(department_id, input).await.map_err(|err| {
            rejected(
                "Create employee",
                format!("department_id={}", department_id),
                err,
            )
        })
    }

    async fn register(&self, department_id: Uuid, input: NewEmployee) -> AppResult<Employee> {
        let input = input.trimmed();
        validate_payload(&input)?;

        let mut tx = self.store.begin().await?;
        tx.get_department(department_id).await?;

        let employee = Employee {
            id: Uuid::new_v4(),
            department_id,
            full_name: input.full_name,
            position: input.position,
            hired_at: input.hired_at,
            created_at: Utc::now(),
        };
        tx.insert_employee(&employee).await?;
        tx.commit().await?;

        info!(
            "Created employee id={} department_id={}",
            employee.id, employee.department_id
        );
        Ok(employee)
    }

    pub async fn get_employee(&self, id: Uuid) -> AppResult<Employee> {
        let mut tx = self.store.snapshot().await?;
        tx.get_employee(id).await
    }
}
