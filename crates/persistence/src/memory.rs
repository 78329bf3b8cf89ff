//! In-memory grant store.
//!
//! Backs the engine in tests and local development. Like the Postgres
//! store it enforces no pair uniqueness: that invariant belongs to the
//! engine.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::store::{GrantStore, StoreError};
use domain::models::{Account, Grant, GrantPredicate, Tool, ToolStatus};

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<Uuid, Account>,
    tools: HashMap<Uuid, Tool>,
    grants: HashMap<(Uuid, Uuid), Grant>,
}

/// Grant store holding everything in process memory.
#[derive(Debug, Default)]
pub struct InMemoryGrantStore {
    state: RwLock<State>,
}

impl InMemoryGrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an account. Accounts are read-only to the engine, so tests
    /// populate them directly.
    pub fn put_account(&self, account: Account) {
        self.state
            .write()
            .unwrap()
            .accounts
            .insert(account.id, account);
    }

    /// Seeds a tool without going through the engine's tool lifecycle.
    pub fn put_tool(&self, tool: Tool) {
        self.state.write().unwrap().tools.insert(tool.id, tool);
    }

    /// Number of grant rows currently held.
    pub fn grant_count(&self) -> usize {
        self.state.read().unwrap().grants.len()
    }
}

#[async_trait]
impl GrantStore for InMemoryGrantStore {
    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.state.read().unwrap().accounts.get(&id).cloned())
    }

    async fn list_accounts_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Account>, StoreError> {
        let state = self.state.read().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| state.accounts.get(id).cloned())
            .collect())
    }

    async fn find_tool(&self, id: Uuid) -> Result<Option<Tool>, StoreError> {
        Ok(self.state.read().unwrap().tools.get(&id).cloned())
    }

    async fn find_tool_by_slug(&self, slug: &str) -> Result<Option<Tool>, StoreError> {
        Ok(self
            .state
            .read()
            .unwrap()
            .tools
            .values()
            .find(|t| t.slug == slug)
            .cloned())
    }

    async fn list_tools(&self, status: Option<ToolStatus>) -> Result<Vec<Tool>, StoreError> {
        let state = self.state.read().unwrap();
        let mut tools: Vec<Tool> = state
            .tools
            .values()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .cloned()
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(tools)
    }

    async fn list_tools_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Tool>, StoreError> {
        let state = self.state.read().unwrap();
        let mut tools: Vec<Tool> = ids
            .iter()
            .filter_map(|id| state.tools.get(id).cloned())
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(tools)
    }

    async fn insert_tool(&self, tool: &Tool) -> Result<(), StoreError> {
        self.state
            .write()
            .unwrap()
            .tools
            .insert(tool.id, tool.clone());
        Ok(())
    }

    async fn update_tool(&self, tool: &Tool) -> Result<(), StoreError> {
        let mut state = self.state.write().unwrap();
        match state.tools.get_mut(&tool.id) {
            Some(existing) => {
                *existing = tool.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_tool(&self, id: Uuid) -> Result<(), StoreError> {
        match self.state.write().unwrap().tools.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }

    async fn find_grant(
        &self,
        account_id: Uuid,
        tool_id: Uuid,
    ) -> Result<Option<Grant>, StoreError> {
        Ok(self
            .state
            .read()
            .unwrap()
            .grants
            .get(&(account_id, tool_id))
            .cloned())
    }

    async fn list_grants(&self, predicate: &GrantPredicate) -> Result<Vec<Grant>, StoreError> {
        let state = self.state.read().unwrap();
        Ok(state
            .grants
            .values()
            .filter(|g| predicate.matches(g))
            .cloned()
            .collect())
    }

    async fn insert_grant(&self, grant: &Grant) -> Result<(), StoreError> {
        self.state
            .write()
            .unwrap()
            .grants
            .insert((grant.account_id, grant.tool_id), grant.clone());
        Ok(())
    }

    async fn update_grant(&self, grant: &Grant) -> Result<(), StoreError> {
        let mut state = self.state.write().unwrap();
        match state.grants.get_mut(&(grant.account_id, grant.tool_id)) {
            Some(existing) => {
                *existing = grant.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_grant(&self, account_id: Uuid, tool_id: Uuid) -> Result<(), StoreError> {
        match self
            .state
            .write()
            .unwrap()
            .grants
            .remove(&(account_id, tool_id))
        {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }
}
