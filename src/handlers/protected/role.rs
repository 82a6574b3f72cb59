// handlers/protected/role.rs - role/menu association

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::audit;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleMenusBody {
    pub menu_ids: Vec<i32>,
}

/// PUT /role/:role_id/menus
pub async fn assign_menus(
    State(state): State<AppState>,
    user: AuthUser,
    Path(role_id): Path<i32>,
    Json(body): Json<RoleMenusBody>,
) -> ApiResult<Value> {
    user.require("sys_role_perm")?;

    state.menus.assign(role_id, body.menu_ids).await?;
    let menu_ids = state.menus.role_menu_ids(role_id).await?;

    audit(&state, &user, "role.assign_menus", &format!("role {} now grants menus {:?}", role_id, menu_ids));
    Ok(ApiResponse::success(json!({ "roleId": role_id, "menuIds": menu_ids })))
}
