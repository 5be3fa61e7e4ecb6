//! Runs against a real database:
//! `DATABASE_URL=postgres://… cargo test --test postgres_store_test -- --ignored`
//! Every test works under its own uniquely named root, so runs can share a
//! scratch database.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Barrier;
use uuid::Uuid;

use orgchart_backend::config::Config;
use orgchart_backend::db::{EntityStore, PgStore, StoreTx};
use orgchart_backend::errors::AppError;
use orgchart_backend::models::{
    DeleteDepartment, DeleteMode, Department, DepartmentUpdate, Employee, EmployeeSort,
    NewDepartment, NewEmployee, TreeQuery,
};
use orgchart_backend::services::OrgServices;

async fn setup() -> (Arc<PgStore>, OrgServices<PgStore>) {
    dotenv::dotenv().ok();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let store = Arc::new(PgStore::connect(&url).await.unwrap());
    let services = OrgServices::new(store.clone(), &Config::default());
    (store, services)
}

async fn department(
    services: &OrgServices<PgStore>,
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

async fn unique_root(services: &OrgServices<PgStore>) -> Department {
    department(services, &format!("root-{}", Uuid::new_v4()), None).await
}

async fn employee(services: &OrgServices<PgStore>, department_id: Uuid, name: &str) -> Employee {
    services
        .employees
        .create_employee(
            department_id,
            NewEmployee {
                full_name: name.to_string(),
                position: "Engineer".to_string(),
                hired_at: None,
            },
        )
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn unique_index_violation_maps_to_conflict() {
    let (store, services) = setup().await;
    let root = unique_root(&services).await;
    department(&services, "Ops", Some(root.id)).await;

    // Straight through the store, so only the index stands in the way.
    let mut tx = store.begin().await.unwrap();
    let result = tx
        .insert_department(&Department {
            id: Uuid::new_v4(),
            name: "Ops".into(),
            parent_id: Some(root.id),
            created_at: Utc::now(),
        })
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))), "{result:?}");
    drop(tx);

    let mut tx = store.begin().await.unwrap();
    let root_clash = tx
        .insert_department(&Department {
            id: Uuid::new_v4(),
            name: root.name.clone(),
            parent_id: None,
            created_at: Utc::now(),
        })
        .await;
    assert!(matches!(root_clash, Err(AppError::Conflict(_))), "{root_clash:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "needs DATABASE_URL"]
async fn concurrent_sibling_creates_admit_exactly_one() {
    let (store, services) = setup().await;
    let root = unique_root(&services).await;
    let barrier = Arc::new(Barrier::new(6));

    let mut handles = Vec::new();
    for _ in 0..6 {
        let services = services.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            services
                .departments
                .create_department(NewDepartment {
                    name: "Platform".into(),
                    parent_id: Some(root.id),
                })
                .await
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(AppError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(created, 1);

    let mut tx = store.snapshot().await.unwrap();
    assert_eq!(tx.list_children(root.id).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn cascade_deletes_whole_subtree() {
    let (store, services) = setup().await;
    let root = unique_root(&services).await;
    let a = department(&services, "A", Some(root.id)).await;
    let a1 = department(&services, "A1", Some(a.id)).await;
    let b = department(&services, "B", Some(root.id)).await;
    for (dept, name) in [(root.id, "Rae"), (a.id, "Ann"), (a1.id, "Abe"), (b.id, "Bea")] {
        employee(&services, dept, name).await;
    }

    let summary = services
        .departments
        .delete_department(
            root.id,
            DeleteDepartment {
                mode: DeleteMode::Cascade,
                reassign_to_department_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(summary.departments_removed, 4);
    assert_eq!(summary.employees_removed, 4);

    let mut tx = store.snapshot().await.unwrap();
    for id in [root.id, a.id, a1.id, b.id] {
        assert!(tx.find_department(id).await.unwrap().is_none());
    }
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn reassign_moves_children_and_employees() {
    let (store, services) = setup().await;
    let root = unique_root(&services).await;
    let target = department(&services, "Target", Some(root.id)).await;
    let doomed = department(&services, "Doomed", Some(root.id)).await;
    let child = department(&services, "Child", Some(doomed.id)).await;
    let eve = employee(&services, doomed.id, "Eve").await;

    let summary = services
        .departments
        .delete_department(
            doomed.id,
            DeleteDepartment {
                mode: DeleteMode::Reassign,
                reassign_to_department_id: Some(target.id),
            },
        )
        .await
        .unwrap();
    assert_eq!(summary.children_reassigned, 1);
    assert_eq!(summary.employees_reassigned, 1);

    let mut tx = store.snapshot().await.unwrap();
    assert!(tx.find_department(doomed.id).await.unwrap().is_none());
    assert_eq!(tx.get_department(child.id).await.unwrap().parent_id, Some(target.id));
    assert_eq!(tx.get_employee(eve.id).await.unwrap().department_id, target.id);
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn reparent_into_descendant_conflicts() {
    let (_, services) = setup().await;
    let root = unique_root(&services).await;
    let child = department(&services, "Child", Some(root.id)).await;
    let grandchild = department(&services, "Grandchild", Some(child.id)).await;

    let result = services
        .departments
        .update_department(
            root.id,
            DepartmentUpdate {
                name: None,
                parent_id: Some(Some(grandchild.id)),
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))), "{result:?}");
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn full_name_sort_matches_memory_store() {
    let (_, services) = setup().await;
    let root = unique_root(&services).await;
    for name in ["bob", "Zed", "alice", "Alice"] {
        employee(&services, root.id, name).await;
    }

    let tree = services
        .tree
        .get_department_tree(
            root.id,
            TreeQuery {
                depth: 1,
                include_employees: true,
                sort_employees: EmployeeSort::FullName,
            },
        )
        .await
        .unwrap();
    let names: Vec<String> = tree
        .employees
        .unwrap()
        .into_iter()
        .map(|e| e.full_name)
        .collect();
    assert_eq!(names, ["Alice", "Zed", "alice", "bob"]);
}
