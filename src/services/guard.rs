//! Tree invariant checks run inside a write transaction before anything is
//! written. Nothing here mutates the store.

use std::collections::HashSet;
use uuid::Uuid;

use crate::db::StoreTx;
use crate::errors::{AppError, AppResult};
use crate::models::Department;

pub const MAX_NAME_LEN: u64 = 200;

/// Trims `raw` and checks it holds 1..=200 characters.
pub fn validate_name(field: &str, raw: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(field, "must not be empty"));
    }
    if !validator::validate_length(trimmed, Some(1), Some(MAX_NAME_LEN), None) {
        return Err(AppError::validation(
            field,
            format!("must be at most {} characters", MAX_NAME_LEN),
        ));
    }
    Ok(trimmed.to_string())
}

pub async fn check_sibling_uniqueness<T: StoreTx>(
    tx: &mut T,
    parent_id: Option<Uuid>,
    name: &str,
    exclude_id: Option<Uuid>,
) -> AppResult<()> {
    let clash = tx
        .list_departments_by_parent(parent_id)
        .await?
        .into_iter()
        .any(|sibling| Some(sibling.id) != exclude_id && sibling.name == name);

    if clash {
        return Err(AppError::Conflict(format!(
            "Department with name {:?} already exists under this parent",
            name
        )));
    }
    Ok(())
}

/// Fails when `node_id` would become its own ancestor under
/// `proposed_parent_id`.
pub async fn check_no_cycle<T: StoreTx>(
    tx: &mut T,
    node_id: Uuid,
    proposed_parent_id: Uuid,
) -> AppResult<()> {
    if proposed_parent_id == node_id {
        return Err(AppError::Conflict(format!(
            "Department {} cannot be its own parent",
            node_id
        )));
    }

    let bound = tx.count_departments().await?;
    let mut steps = 0u64;
    let mut current = Some(proposed_parent_id);

    while let Some(id) = current {
        if id == node_id {
            return Err(AppError::Conflict(format!(
                "Department {} is an ancestor of {} (would create a cycle)",
                node_id, proposed_parent_id
            )));
        }
        steps += 1;
        if steps > bound {
            return Err(AppError::Internal(format!(
                "ancestor walk from {} exceeded {} steps",
                proposed_parent_id, bound
            )));
        }
        current = tx.get_department(id).await?.parent_id;
    }

    Ok(())
}

/// Checks that `adoptees` can be re-parented under `target_id` once
/// `departing_id` is gone without two siblings sharing a name.
pub async fn check_adoption<T: StoreTx>(
    tx: &mut T,
    target_id: Uuid,
    departing_id: Uuid,
    adoptees: &[Department],
) -> AppResult<()> {
    let taken: HashSet<String> = tx
        .list_children(target_id)
        .await?
        .into_iter()
        .filter(|d| d.id != departing_id)
        .map(|d| d.name)
        .collect();

    if let Some(clash) = adoptees.iter().find(|d| taken.contains(&d.name)) {
        return Err(AppError::Conflict(format!(
            "Department {} already has a child named {:?}",
            target_id, clash.name
        )));
    }
    Ok(())
}
