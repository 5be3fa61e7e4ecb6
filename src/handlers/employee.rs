use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::db::EntityStore;
use crate::errors::AppError;
use crate::models::NewEmployee;
use crate::services::OrgServices;

pub async fn create_employee<S: EntityStore>(
    services: web::Data<OrgServices<S>>,
    department_id: web::Path<Uuid>,
    new_employee: web::Json<NewEmployee>,
) -> Result<HttpResponse, AppError> {
    let employee = services
        .employees
        .create_employee(department_id.into_inner(), new_employee.into_inner())
        .await?;

    Ok(HttpResponse::Created().json(employee))
}
