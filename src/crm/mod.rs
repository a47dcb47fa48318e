pub mod bitrix;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::model::work_item::{EmployeeId, RawFields, RawRecord, WorkItemKind};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub assigned_to: Option<EmployeeId>,
}

impl ItemFilter {
    pub fn assigned_to(employee: EmployeeId) -> Self {
        Self {
            assigned_to: Some(employee),
        }
    }
}

/// Page size the CRM serves list calls in.
pub const LIST_PAGE_SIZE: u32 = 50;

/// 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ItemPage {
    pub items: Vec<RawRecord>,
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFilter {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserPage {
    pub users: Vec<Map<String, Value>>,
    pub next: Option<u64>,
}

/// Typed CRUD access to the CRM's generic item API and its user API.
///
/// Every call may fail with a transport or remote error; callers map those to
/// a server error.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn list_items(
        &self,
        kind: WorkItemKind,
        filter: &ItemFilter,
        page: PageRequest,
    ) -> Result<ItemPage>;
    async fn get_item(&self, kind: WorkItemKind, id: &str) -> Result<Option<RawRecord>>;
    async fn create_item(&self, kind: WorkItemKind, fields: &RawFields) -> Result<RawRecord>;
    async fn update_item(&self, kind: WorkItemKind, id: &str, fields: &RawFields)
        -> Result<RawRecord>;
    /// Returns `false` when the store had nothing to delete.
    async fn delete_item(&self, kind: WorkItemKind, id: &str) -> Result<bool>;
    async fn list_users(&self, filter: &UserFilter, cursor: Option<u64>) -> Result<UserPage>;

    /// Number of items of `kind` currently assigned to `employee`.
    async fn count_assigned(&self, kind: WorkItemKind, employee: EmployeeId) -> Result<u64> {
        let page = self
            .list_items(
                kind,
                &ItemFilter::assigned_to(employee),
                PageRequest { page: 1, limit: 1 },
            )
            .await?;
        Ok(page.total)
    }

    /// Every item of `kind` matching `filter`, fetched page by page.
    async fn list_all_items(&self, kind: WorkItemKind, filter: &ItemFilter) -> Result<Vec<RawRecord>> {
        let mut items = Vec::new();
        let mut page = PageRequest {
            page: 1,
            limit: LIST_PAGE_SIZE,
        };
        loop {
            let batch = self.list_items(kind, filter, page).await?;
            let fetched = batch.items.len();
            items.extend(batch.items);
            if fetched == 0 || items.len() as u64 >= batch.total {
                break;
            }
            page.page += 1;
        }
        Ok(items)
    }

    /// Walk the user cursor until the store reports no further page.
    async fn list_all_users(&self, filter: &UserFilter) -> Result<Vec<Map<String, Value>>> {
        let mut users = Vec::new();
        let mut cursor = None;
        loop {
            let page = self.list_users(filter, cursor).await?;
            users.extend(page.users);
            match page.next {
                Some(next) if Some(next) != cursor => cursor = Some(next),
                _ => break,
            }
        }
        Ok(users)
    }
}
