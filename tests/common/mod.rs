#![allow(dead_code)]

use std::sync::Arc;
use uuid::Uuid;

use orgchart_backend::config::Config;
use orgchart_backend::db::{EntityStore, MemoryStore, StoreTx};
use orgchart_backend::models::{Department, Employee, NewDepartment, NewEmployee};
use orgchart_backend::services::OrgServices;

pub fn setup() -> (Arc<MemoryStore>, OrgServices<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let services = OrgServices::new(store.clone(), &Config::default());
    (store, services)
}

pub async fn department(
    services: &OrgServices<MemoryStore>,
    name: &str,
    parent_id: Option<Uuid>,
) -> Department {
    services
        .departments
        .create_department(NewDepartment {
            name: name.to_string(),
            parent_id,
        })
        .await
        .unwrap()
}

pub async fn employee(
    services: &OrgServices<MemoryStore>,
    department_id: Uuid,
    full_name: &str,
) -> Employee {
    services
        .employees
        .create_employee(
            department_id,
            NewEmployee {
                full_name: full_name.to_string(),
                position: "Engineer".to_string(),
                hired_at: None,
            },
        )
        .await
        .unwrap()
}

/// Writes parent links A -> B -> A straight through the store, bypassing the
/// cycle check. Returns `(a, b)`.
pub async fn corrupt_into_cycle(
    store: &MemoryStore,
    services: &OrgServices<MemoryStore>,
) -> (Department, Department) {
    let mut a = department(services, "A", None).await;
    let b = department(services, "B", Some(a.id)).await;

    let mut tx = store.begin().await.unwrap();
    a.parent_id = Some(b.id);
    tx.update_department(&a).await.unwrap();
    tx.commit().await.unwrap();
    (a, b)
}
