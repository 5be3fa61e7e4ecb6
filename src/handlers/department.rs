use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::db::EntityStore;
use crate::errors::AppError;
use crate::models::{DeleteDepartment, DepartmentUpdate, NewDepartment, TreeQuery};
use crate::services::OrgServices;

pub async fn create_department<S: EntityStore>(
    services: web::Data<OrgServices<S>>,
    new_department: web::Json<NewDepartment>,
) -> Result<HttpResponse, AppError> {
    let department = services
        .departments
        .create_department(new_department.into_inner())
        .await?;

    Ok(HttpResponse::Created().json(department))
}

pub async fn get_department<S: EntityStore>(
    services: web::Data<OrgServices<S>>,
    department_id: web::Path<Uuid>,
    query: web::Query<TreeQuery>,
) -> Result<HttpResponse, AppError> {
    let tree = services
        .tree
        .get_department_tree(department_id.into_inner(), query.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(tree))
}

pub async fn update_department<S: EntityStore>(
    services: web::Data<OrgServices<S>>,
    department_id: web::Path<Uuid>,
    updates: web::Json<DepartmentUpdate>,
) -> Result<HttpResponse, AppError> {
    let department = services
        .departments
        .update_department(department_id.into_inner(), updates.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(department))
}

pub async fn delete_department<S: EntityStore>(
    services: web::Data<OrgServices<S>>,
    department_id: web::Path<Uuid>,
    query: web::Query<DeleteDepartment>,
) -> Result<HttpResponse, AppError> {
    services
        .departments
        .delete_department(department_id.into_inner(), query.into_inner())
        .await?;

    Ok(HttpResponse::NoContent().finish())
}
