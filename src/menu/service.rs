use std::collections::BTreeMap;
use std::sync::Arc;

use super::{build_tree, Menu, MenuError, MenuRepository, MenuTree, MenuType, ROOT_MENU_ID};
use crate::tenant::{self, TenantId};

/// Menu operations for the tenant of the request being handled
#[derive(Clone)]
pub struct MenuService {
    repo: Arc<dyn MenuRepository>,
}

impl MenuService {
    pub fn new(repo: Arc<dyn MenuRepository>) -> Self {
        Self { repo }
    }

    fn tenant(&self) -> Result<TenantId, MenuError> {
        Ok(tenant::current()?)
    }

    /// Navigation tree for a user holding `roles`: menus only, no buttons
    pub async fn user_menu(&self, roles: &[i32]) -> Result<Vec<MenuTree>, MenuError> {
        let tenant = self.tenant()?;

        let mut granted: BTreeMap<i32, Menu> = BTreeMap::new();
        for role_id in roles {
            for menu in self.repo.find_by_role(tenant, *role_id).await? {
                granted.entry(menu.menu_id).or_insert(menu);
            }
        }

        let mut nodes: Vec<MenuTree> = granted
            .into_values()
            .filter(|m| m.menu_type == MenuType::Menu)
            .map(MenuTree::from)
            .collect();
        nodes.sort_by_key(|n| n.sort);

        Ok(build_tree(nodes, ROOT_MENU_ID))
    }

    /// Every menu and button of the tenant as a tree
    pub async fn tree(&self) -> Result<Vec<MenuTree>, MenuError> {
        let tenant = self.tenant()?;
        let nodes = self.repo.list(tenant).await?.into_iter().map(MenuTree::from).collect();
        Ok(build_tree(nodes, ROOT_MENU_ID))
    }

    pub async fn role_menu_ids(&self, role_id: i32) -> Result<Vec<i32>, MenuError> {
        let tenant = self.tenant()?;
        Ok(self
            .repo
            .find_by_role(tenant, role_id)
            .await?
            .into_iter()
            .map(|m| m.menu_id)
            .collect())
    }

    pub async fn get(&self, menu_id: i32) -> Result<Menu, MenuError> {
        let tenant = self.tenant()?;
        self.repo.get(tenant, menu_id).await?.ok_or(MenuError::NotFound(menu_id))
    }

    pub async fn create(&self, menu: Menu) -> Result<Menu, MenuError> {
        let tenant = self.tenant()?;
        menu.validate()?;
        self.check_parent(tenant, &menu).await?;
        let created = self.repo.insert(tenant, menu).await?;
        tracing::info!(tenant = %tenant, menu_id = created.menu_id, "Created menu");
        Ok(created)
    }

    pub async fn update(&self, menu: Menu) -> Result<Menu, MenuError> {
        let tenant = self.tenant()?;
        menu.validate()?;
        self.check_parent(tenant, &menu).await?;
        self.repo.update(tenant, menu).await
    }

    /// Delete a leaf menu; menus with children are refused
    pub async fn remove(&self, menu_id: i32) -> Result<(), MenuError> {
        let tenant = self.tenant()?;
        let menus = self.repo.list(tenant).await?;
        if !menus.iter().any(|m| m.menu_id == menu_id) {
            return Err(MenuError::NotFound(menu_id));
        }
        if menus.iter().any(|m| m.parent_id == menu_id) {
            return Err(MenuError::HasChildren(menu_id));
        }
        self.repo.remove(tenant, menu_id).await?;
        tracing::info!(tenant = %tenant, menu_id, "Removed menu");
        Ok(())
    }

    /// Replace the menus granted to `role_id`
    pub async fn assign(&self, role_id: i32, menu_ids: Vec<i32>) -> Result<(), MenuError> {
        let tenant = self.tenant()?;
        let mut menu_ids = menu_ids;
        menu_ids.sort_unstable();
        menu_ids.dedup();
        self.repo.assign_role_menus(tenant, role_id, &menu_ids).await
    }

    async fn check_parent(&self, tenant: TenantId, menu: &Menu) -> Result<(), MenuError> {
        if menu.parent_id == ROOT_MENU_ID || self.repo.get(tenant, menu.parent_id).await?.is_some() {
            return Ok(());
        }
        Err(MenuError::Validation {
            field: "parentId".to_string(),
            message: format!("parent menu {} does not exist", menu.parent_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::MemoryMenuRepository;

    fn service() -> MenuService {
        MenuService::new(Arc::new(MemoryMenuRepository::new()))
    }

    async fn seed(service: &MenuService) {
        service.create(Menu::new(1, "System", -1).with_sort(1)).await.unwrap();
        service.create(Menu::new(2, "Users", 1).with_sort(2)).await.unwrap();
        service.create(Menu::new(3, "Menus", 1).with_sort(1)).await.unwrap();
        service
            .create(Menu::new(4, "Delete user", 2).with_type(MenuType::Button).with_permission("sys_user_del"))
            .await
            .unwrap();
        service.create(Menu::new(5, "Logs", -1).with_sort(0)).await.unwrap();
    }

    #[tokio::test]
    async fn requires_tenant_context() {
        let err = service().tree().await.unwrap_err();
        assert!(matches!(err, MenuError::Tenant(_)));
    }

    #[tokio::test]
    async fn user_menu_merges_roles_and_drops_buttons() {
        tenant::scope(TenantId(1), async {
            let service = service();
            seed(&service).await;
            service.assign(1, vec![1, 2, 4]).await.unwrap();
            service.assign(2, vec![1, 3, 5]).await.unwrap();

            let tree = service.user_menu(&[1, 2]).await.unwrap();
            assert_eq!(tree.iter().map(|n| n.id).collect::<Vec<_>>(), vec![5, 1]);
            let children: Vec<i32> = tree[1].children.iter().map(|n| n.id).collect();
            assert_eq!(children, vec![3, 2]);
            assert!(tree[1].children[1].children.is_empty());
        })
        .await;
    }

    #[tokio::test]
    async fn operations_are_scoped_to_the_current_tenant() {
        let service = service();
        tenant::scope(TenantId(1), seed(&service)).await;

        let other = tenant::scope(TenantId(2), service.tree()).await.unwrap();
        assert!(other.is_empty());

        let own = tenant::scope(TenantId(1), service.tree()).await.unwrap();
        assert_eq!(own.len(), 2);
    }

    #[tokio::test]
    async fn remove_refuses_menus_with_children() {
        tenant::scope(TenantId(1), async {
            let service = service();
            seed(&service).await;

            assert!(matches!(service.remove(1).await, Err(MenuError::HasChildren(1))));
            service.remove(4).await.unwrap();
            service.remove(2).await.unwrap();
            assert!(matches!(service.get(2).await, Err(MenuError::NotFound(2))));
            assert!(matches!(service.remove(99).await, Err(MenuError::NotFound(99))));
        })
        .await;
    }

    #[tokio::test]
    async fn create_checks_parent_exists() {
        tenant::scope(TenantId(1), async {
            let err = service().create(Menu::new(0, "Orphan", 77)).await.unwrap_err();
            assert!(matches!(err, MenuError::Validation { field, .. } if field == "parentId"));
        })
        .await;
    }

    #[tokio::test]
    async fn role_menu_ids_reflect_assignment() {
        tenant::scope(TenantId(1), async {
            let service = service();
            seed(&service).await;
            service.assign(7, vec![3, 3, 1]).await.unwrap();
            let mut ids = service.role_menu_ids(7).await.unwrap();
            ids.sort_unstable();
            assert_eq!(ids, vec![1, 3]);
        })
        .await;
    }
}
