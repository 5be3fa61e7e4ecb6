use async_trait::async_trait;
use log::info;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::db::{collect_subtree_ids, EntityStore, StoreTx, SubtreeRemoval};
use crate::errors::{AppError, AppResult};
use crate::models::{Department, Employee, EmployeeSort};

const DEPARTMENT_COLUMNS: &str = "id, name, parent_id, created_at";
const EMPLOYEE_COLUMNS: &str = "id, department_id, full_name, position, hired_at, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects and applies the embedded migrations.
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|err| AppError::DatabaseError(err.to_string()))?;

        info!("Database migrations applied");
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl EntityStore for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> AppResult<PgTx> {
        let mut tx = self.pool.begin().await?;
        // Serializes department writers so sibling checks and the writes that
        // follow them see the same rows. Plain reads are not blocked.
        sqlx::query("LOCK TABLE departments IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;
        Ok(PgTx { tx })
    }

    async fn snapshot(&self) -> AppResult<PgTx> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(PgTx { tx })
    }
}

impl PgTx {
    async fn require_department(&mut self, id: Uuid) -> AppResult<()> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM departments WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut *self.tx)
                .await?;
        if exists {
            Ok(())
        } else {
            Err(AppError::not_found("department", id))
        }
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn find_department(&mut self, id: Uuid) -> AppResult<Option<Department>> {
        let sql = format!("SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE id = $1");
        let department = sqlx::query_as::<_, Department>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(department)
    }

    async fn insert_department(&mut self, department: &Department) -> AppResult<()> {
        if let Some(parent_id) = department.parent_id {
            self.require_department(parent_id).await?;
        }
        sqlx::query(
            "INSERT INTO departments (id, name, parent_id, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(department.id)
        .bind(&department.name)
        .bind(department.parent_id)
        .bind(department.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_department(&mut self, department: &Department) -> AppResult<()> {
        if let Some(parent_id) = department.parent_id {
            self.require_department(parent_id).await?;
        }
        let result = sqlx::query("UPDATE departments SET name = $1, parent_id = $2 WHERE id = $3")
            .bind(&department.name)
            .bind(department.parent_id)
            .bind(department.id)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("department", department.id));
        }
        Ok(())
    }

    async fn delete_department(&mut self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("department", id));
        }
        Ok(())
    }

    async fn list_departments_by_parent(
        &mut self,
        parent_id: Option<Uuid>,
    ) -> AppResult<Vec<Department>> {
        let departments = match parent_id {
            Some(parent_id) => {
                self.require_department(parent_id).await?;
                let sql = format!(
                    "SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE parent_id = $1 ORDER BY name COLLATE \"C\" ASC, id ASC"
                );
                sqlx::query_as::<_, Department>(&sql)
                    .bind(parent_id)
                    .fetch_all(&mut *self.tx)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE parent_id IS NULL ORDER BY name COLLATE \"C\" ASC, id ASC"
                );
                sqlx::query_as::<_, Department>(&sql)
                    .fetch_all(&mut *self.tx)
                    .await?
            }
        };
        Ok(departments)
    }

    async fn count_departments(&mut self) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM departments")
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count as u64)
    }

    async fn find_employee(&mut self, id: Uuid) -> AppResult<Option<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = $1");
        let employee = sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(employee)
    }

    async fn insert_employee(&mut self, employee: &Employee) -> AppResult<()> {
        self.require_department(employee.department_id).await?;
        sqlx::query(
            "INSERT INTO employees (id, department_id, full_name, position, hired_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(employee.id)
        .bind(employee.department_id)
        .bind(&employee.full_name)
        .bind(&employee.position)
        .bind(employee.hired_at)
        .bind(employee.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn list_employees_by_department(
        &mut self,
        department_id: Uuid,
        sort: EmployeeSort,
    ) -> AppResult<Vec<Employee>> {
        self.require_department(department_id).await?;
        let sql = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE department_id = $1 ORDER BY {}",
            sort.order_by()
        );
        let employees = sqlx::query_as::<_, Employee>(&sql)
            .bind(department_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(employees)
    }

    async fn reassign_employees(&mut self, from: Uuid, to: Uuid) -> AppResult<u64> {
        self.require_department(from).await?;
        self.require_department(to).await?;
        let result = sqlx::query("UPDATE employees SET department_id = $1 WHERE department_id = $2")
            .bind(to)
            .bind(from)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn reassign_children(&mut self, from: Uuid, to: Uuid) -> AppResult<u64> {
        self.require_department(from).await?;
        self.require_department(to).await?;
        let result = sqlx::query("UPDATE departments SET parent_id = $1 WHERE parent_id = $2")
            .bind(to)
            .bind(from)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_subtree_cascade(&mut self, root: Uuid) -> AppResult<SubtreeRemoval> {
        let ids = collect_subtree_ids(self, root).await?;

        let employees = sqlx::query("DELETE FROM employees WHERE department_id = ANY($1)")
            .bind(&ids)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();
        // Parent links inside the set are checked at end of statement.
        let departments = sqlx::query("DELETE FROM departments WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(SubtreeRemoval {
            departments,
            employees,
        })
    }

    async fn commit(self) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
