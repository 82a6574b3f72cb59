// handlers/protected/menu.rs - menu administration for the request tenant

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use super::audit;
use crate::menu::{Menu, MenuTree};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /menu - navigation tree for the caller's roles
pub async fn user_menu(State(state): State<AppState>, user: AuthUser) -> ApiResult<Vec<MenuTree>> {
    let tree = state.menus.user_menu(&user.roles).await?;
    Ok(ApiResponse::success(tree))
}

/// GET /menu/tree
pub async fn tree(State(state): State<AppState>, _user: AuthUser) -> ApiResult<Vec<MenuTree>> {
    Ok(ApiResponse::success(state.menus.tree().await?))
}

/// GET /menu/tree/:role_id - menu ids granted to a role
pub async fn role_tree(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(role_id): Path<i32>,
) -> ApiResult<Vec<i32>> {
    Ok(ApiResponse::success(state.menus.role_menu_ids(role_id).await?))
}

/// GET /menu/:id
pub async fn get(State(state): State<AppState>, _user: AuthUser, Path(menu_id): Path<i32>) -> ApiResult<Menu> {
    Ok(ApiResponse::success(state.menus.get(menu_id).await?))
}

/// POST /menu
pub async fn create(State(state): State<AppState>, user: AuthUser, Json(menu): Json<Menu>) -> ApiResult<Menu> {
    user.require("sys_menu_add")?;

    let created = state.menus.create(menu).await?;
    audit(&state, &user, "menu.create", &format!("created menu {} '{}'", created.menu_id, created.name));
    Ok(ApiResponse::created(created))
}

/// PUT /menu
pub async fn update(State(state): State<AppState>, user: AuthUser, Json(menu): Json<Menu>) -> ApiResult<Menu> {
    user.require("sys_menu_edit")?;

    let updated = state.menus.update(menu).await?;
    audit(&state, &user, "menu.update", &format!("updated menu {}", updated.menu_id));
    Ok(ApiResponse::success(updated))
}

/// DELETE /menu/:id
pub async fn delete(State(state): State<AppState>, user: AuthUser, Path(menu_id): Path<i32>) -> ApiResult<Value> {
    user.require("sys_menu_del")?;

    state.menus.remove(menu_id).await?;
    audit(&state, &user, "menu.delete", &format!("deleted menu {}", menu_id));
    Ok(ApiResponse::success(json!({ "menuId": menu_id, "deleted": true })))
}
