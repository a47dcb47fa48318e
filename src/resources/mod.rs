pub mod context;
pub mod employees;
pub mod pagination;
pub mod work_items;


use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::assignment::AssignmentPolicy;
use crate::cache::{cache_key, resource_pattern, ResponseCache};
use crate::crm::ItemStore;
use crate::error::ApiError;
use crate::model::work_item::WorkItemKind;
use context::{Method, RequestContext};
use employees::EmployeeService;
use pagination::Pagination;
use work_items::WorkItemService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Tickets,
    Bugs,
    Employees,
}

impl Resource {
    pub const ALL: [Resource; 3] = [Resource::Tickets, Resource::Bugs, Resource::Employees];

    pub fn parse(endpoint: &str) -> Option<Self> {
        Resource::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(endpoint.trim()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Tickets => "tickets",
            Resource::Bugs => "bugs",
            Resource::Employees => "employees",
        }
    }

    /// Cached reads made stale by a write to this resource. Employee payloads
    /// embed tickets, so ticket writes reach them too. When tickets and bugs
    /// share one CRM entity, a write to either is visible through both.
    pub fn invalidates(&self, shared_entity: bool) -> &'static [Resource] {
        match (self, shared_entity) {
            (Resource::Tickets | Resource::Bugs, true) => &Resource::ALL,
            (Resource::Tickets, false) => &[Resource::Tickets, Resource::Employees],
            (Resource::Bugs, false) => &[Resource::Bugs],
            (Resource::Employees, _) => &[Resource::Employees],
        }
    }
}

/// Routes requests to the per-resource orchestrators and wraps reads and
/// writes with the response cache.
pub struct Gateway {
    tickets: WorkItemService,
    bugs: WorkItemService,
    employees: EmployeeService,
    cache: Option<Arc<dyn ResponseCache>>,
    shared_entity: bool,
}

impl Gateway {
    pub fn new(
        store: Arc<dyn ItemStore>,
        cache: Option<Arc<dyn ResponseCache>>,
        max_concurrent_lookups: usize,
        shared_entity: bool,
    ) -> Self {
        let policy = Arc::new(AssignmentPolicy::new(store.clone(), max_concurrent_lookups));
        Self {
            tickets: WorkItemService::new(WorkItemKind::Ticket, store.clone(), policy.clone()),
            bugs: WorkItemService::new(WorkItemKind::Bug, store.clone(), policy),
            employees: EmployeeService::new(store, max_concurrent_lookups),
            cache,
            shared_entity,
        }
    }

    pub async fn handle(&self, resource: Resource, ctx: &RequestContext) -> Result<Value, ApiError> {
        debug!(
            resource = resource.as_str(),
            method = ctx.method.as_str(),
            id = ctx.id.as_deref(),
            "dispatching request"
        );

        let key = (ctx.method == Method::Get).then(|| {
            let pagination = Pagination::from_params(ctx.param("page"), ctx.param("limit"));
            cache_key(
                ctx.method.as_str(),
                resource.as_str(),
                ctx.id.as_deref(),
                pagination.page,
                pagination.limit,
            )
        });

        if let Some(key) = &key {
            if let Some(hit) = self.cached(key).await {
                debug!(key, "cache hit");
                return Ok(hit);
            }
        }

        let result = match resource {
            Resource::Tickets => self.tickets.handle(ctx).await,
            Resource::Bugs => self.bugs.handle(ctx).await,
            Resource::Employees => self.employees.handle(ctx).await,
        };

        match &result {
            Ok(payload) => {
                if let Some(key) = &key {
                    self.store(key, payload).await;
                } else if ctx.method.is_write() {
                    self.invalidate(resource).await;
                }
            }
            Err(ApiError::ServerError(message)) => {
                error!(resource = resource.as_str(), method = ctx.method.as_str(), %message, "request failed");
            }
            Err(err) => {
                debug!(resource = resource.as_str(), status = err.status_code(), %err, "request rejected");
            }
        }

        result
    }

    async fn cached(&self, key: &str) -> Option<Value> {
        let cache = self.cache.as_ref()?;
        match cache.get(key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(key, error = %format!("{e:#}"), "cache read failed");
                None
            }
        }
    }

    async fn store(&self, key: &str, payload: &Value) {
        let Some(cache) = &self.cache else { return };
        if let Err(e) = cache.set(key, payload).await {
            warn!(key, error = %format!("{e:#}"), "cache write failed");
        }
    }

    async fn invalidate(&self, resource: Resource) {
        let Some(cache) = &self.cache else { return };
        for stale in resource.invalidates(self.shared_entity) {
            match cache.delete_matching(&resource_pattern(stale.as_str())).await {
                Ok(count) => debug!(resource = stale.as_str(), count, "cache invalidated"),
                Err(e) => warn!(resource = stale.as_str(), error = %format!("{e:#}"), "cache invalidation failed"),
            }
        }
    }
}
