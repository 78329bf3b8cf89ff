//! Matrix assembly: the paginated account × tool view of all grants.

use std::collections::HashSet;
use uuid::Uuid;

use domain::models::{
    Account, AccountSortField, AssignmentMatrix, Grant, MatrixFilters, SortDir, ToolStatus,
};
use shared::pagination::PageInfo;

use crate::cache::matrix_cache_key;
use crate::error::EngineError;
use crate::rate_limit::RateLimitOperation;

use super::GrantEngine;

impl GrantEngine {
    /// Builds the assignment matrix for the given filters.
    ///
    /// Tools form the complete column set and are never paginated; account
    /// rows are filtered, sorted, and paginated; grants are then restricted
    /// to the rows on the requested page. Results are cached per filter
    /// combination.
    pub async fn build_matrix(
        &self,
        actor: Uuid,
        filters: MatrixFilters,
    ) -> Result<AssignmentMatrix, EngineError> {
        self.check_rate(actor, RateLimitOperation::List)?;

        let key = matrix_cache_key(&filters);
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(key, "matrix served from cache");
            return Ok(hit);
        }

        let now = self.clock.now();
        let horizon = self.config.expiring_horizon();

        // grant-level filters run inside the store
        let grants = self
            .store
            .list_grants(&filters.grant_predicate(now, horizon))
            .await?;

        let mut tools = self.store.list_tools(Some(ToolStatus::Active)).await?;

        // no qualifying grants means no rows at all: the matrix only shows
        // accounts holding at least one qualifying assignment
        if grants.is_empty() {
            let params = filters.page_params();
            let matrix = AssignmentMatrix {
                assignments: vec![],
                accounts: vec![],
                tools,
                pagination: PageInfo::empty(params),
                from_cache: false,
            };
            let entities: Vec<Uuid> = matrix.tools.iter().map(|tool| tool.id).collect();
            self.cache.insert(key, &matrix, entities);
            return Ok(matrix);
        }
        // grants may still reference tools that were deactivated since;
        // append those columns so no cell dangles
        let known: HashSet<Uuid> = tools.iter().map(|tool| tool.id).collect();
        let orphaned: Vec<Uuid> = grants
            .iter()
            .map(|grant| grant.tool_id)
            .filter(|id| !known.contains(id))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if !orphaned.is_empty() {
            tools.extend(self.store.list_tools_by_ids(&orphaned).await?);
        }

        // account rows come from the surviving grants; account-level
        // filters apply after the load
        let account_ids: Vec<Uuid> = grants
            .iter()
            .map(|grant| grant.account_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let mut accounts = self.store.list_accounts_by_ids(&account_ids).await?;
        if let Some(account_type) = filters.account_type {
            accounts.retain(|account| account.account_type == account_type);
        }
        if let Some(search) = &filters.search {
            let needle = search.to_lowercase();
            accounts.retain(|account| {
                account.name.to_lowercase().contains(&needle)
                    || account.account_type.as_str().contains(&needle)
            });
        }

        sort_accounts(&mut accounts, filters.sort_by, filters.sort_order);

        let params = filters.page_params();
        let total = accounts.len();
        let (start, end) = params.slice_bounds(total);
        let page: Vec<Account> = accounts[start..end].to_vec();

        let on_page: HashSet<Uuid> = page.iter().map(|account| account.id).collect();
        let assignments: Vec<Grant> = grants
            .into_iter()
            .filter(|grant| on_page.contains(&grant.account_id))
            .collect();

        let matrix = AssignmentMatrix {
            assignments,
            accounts: page,
            tools,
            pagination: PageInfo::new(params, total as u64),
            from_cache: false,
        };
        let entities: Vec<Uuid> = matrix
            .accounts
            .iter()
            .map(|account| account.id)
            .chain(matrix.tools.iter().map(|tool| tool.id))
            .collect();
        self.cache.insert(key, &matrix, entities);

        tracing::debug!(
            accounts = matrix.accounts.len(),
            tools = matrix.tools.len(),
            assignments = matrix.assignments.len(),
            total,
            "matrix assembled"
        );
        Ok(matrix)
    }
}

fn sort_accounts(accounts: &mut [Account], field: AccountSortField, dir: SortDir) {
    accounts.sort_by(|a, b| {
        let ordering = match field {
            AccountSortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            AccountSortField::Type => a.account_type.as_str().cmp(b.account_type.as_str()),
            AccountSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            AccountSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        };
        // id tiebreak keeps pages stable across identical sort keys
        let ordering = ordering.then_with(|| a.id.cmp(&b.id));
        match dir {
            SortDir::Asc => ordering,
            SortDir::Desc => ordering.reverse(),
        }
    });
}
