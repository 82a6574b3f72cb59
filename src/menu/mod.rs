// Menu administration: tenant-scoped menu entities, role/menu association and
// the parent/child tree handed to the admin UI.

pub mod repository;
pub mod service;
pub mod tree;

pub use repository::{MemoryMenuRepository, MenuRepository, PgMenuRepository};
pub use service::MenuService;
pub use tree::{build_tree, TreeNode};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tenant::{TenantError, TenantId};

/// Parent id of top-level menus
pub const ROOT_MENU_ID: i32 = -1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MenuType {
    #[default]
    #[serde(rename = "0")]
    Menu,
    #[serde(rename = "1")]
    Button,
}

impl MenuType {
    pub fn as_code(self) -> &'static str {
        match self {
            MenuType::Menu => "0",
            MenuType::Button => "1",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "0" => Some(MenuType::Menu),
            "1" => Some(MenuType::Button),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Menu {
    /// 0 on create lets the repository assign one
    #[serde(default)]
    pub menu_id: i32,
    pub name: String,
    #[serde(default)]
    pub permission: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "root_parent")]
    pub parent_id: i32,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub sort: i32,
    #[serde(default)]
    pub keep_alive: bool,
    #[serde(rename = "type", default)]
    pub menu_type: MenuType,
    /// Always overwritten with the request tenant on write
    #[serde(default)]
    pub tenant_id: TenantId,
    #[serde(default)]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub update_time: Option<DateTime<Utc>>,
}

fn root_parent() -> i32 {
    ROOT_MENU_ID
}

impl Menu {
    pub fn new(menu_id: i32, name: impl Into<String>, parent_id: i32) -> Self {
        Self {
            menu_id,
            name: name.into(),
            permission: None,
            path: None,
            parent_id,
            icon: None,
            sort: 0,
            keep_alive: false,
            menu_type: MenuType::Menu,
            tenant_id: TenantId::default(),
            create_time: None,
            update_time: None,
        }
    }

    pub fn with_sort(mut self, sort: i32) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_type(mut self, menu_type: MenuType) -> Self {
        self.menu_type = menu_type;
        self
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn validate(&self) -> Result<(), MenuError> {
        if self.name.trim().is_empty() {
            return Err(MenuError::Validation {
                field: "name".to_string(),
                message: "name must not be blank".to_string(),
            });
        }
        if self.menu_id != 0 && self.menu_id == self.parent_id {
            return Err(MenuError::Validation {
                field: "parentId".to_string(),
                message: "a menu cannot be its own parent".to_string(),
            });
        }
        Ok(())
    }
}

/// Menu node with nested children, as rendered by the admin UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuTree {
    pub id: i32,
    pub parent_id: i32,
    pub name: String,
    pub path: Option<String>,
    pub icon: Option<String>,
    pub permission: Option<String>,
    pub keep_alive: bool,
    #[serde(rename = "type")]
    pub menu_type: MenuType,
    pub sort: i32,
    pub children: Vec<MenuTree>,
}

impl From<Menu> for MenuTree {
    fn from(menu: Menu) -> Self {
        Self {
            id: menu.menu_id,
            parent_id: menu.parent_id,
            name: menu.name,
            path: menu.path,
            icon: menu.icon,
            permission: menu.permission,
            keep_alive: menu.keep_alive,
            menu_type: menu.menu_type,
            sort: menu.sort,
            children: Vec::new(),
        }
    }
}

impl TreeNode for MenuTree {
    fn id(&self) -> i32 {
        self.id
    }

    fn parent_id(&self) -> i32 {
        self.parent_id
    }

    fn add_child(&mut self, child: Self) {
        self.children.push(child);
    }
}

#[derive(Debug, Error)]
pub enum MenuError {
    #[error("Menu not found: {0}")]
    NotFound(i32),

    #[error("Menu {0} still has child menus")]
    HasChildren(i32),

    #[error("Menu already exists: {0}")]
    AlreadyExists(i32),

    #[error("Invalid menu field '{field}': {message}")]
    Validation { field: String, message: String },

    #[error(transparent)]
    Tenant(#[from] TenantError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_admin_payload() {
        let menu: Menu = serde_json::from_value(json!({
            "name": "Users",
            "path": "/admin/user",
            "type": "0",
            "sort": 2,
            "keepAlive": true
        }))
        .unwrap();

        assert_eq!(menu.menu_id, 0);
        assert_eq!(menu.parent_id, ROOT_MENU_ID);
        assert_eq!(menu.menu_type, MenuType::Menu);
        assert!(menu.keep_alive);
    }

    #[test]
    fn button_type_serializes_as_code() {
        let menu = Menu::new(5, "Delete", 1).with_type(MenuType::Button);
        let value = serde_json::to_value(&menu).unwrap();
        assert_eq!(value["type"], "1");
        assert_eq!(value["menuId"], 5);
        assert_eq!(MenuType::from_code("1"), Some(MenuType::Button));
        assert_eq!(MenuType::from_code("x"), None);
    }

    #[test]
    fn validation_rejects_blank_name_and_self_parent() {
        assert!(matches!(
            Menu::new(0, " ", -1).validate(),
            Err(MenuError::Validation { field, .. }) if field == "name"
        ));
        assert!(Menu::new(3, "Loop", 3).validate().is_err());
        assert!(Menu::new(3, "Ok", -1).validate().is_ok());
    }
}
