use std::sync::Arc;

use futures::{stream, StreamExt, TryStreamExt};
use serde_json::{json, Map, Value};

use super::context::{Method, RequestContext};
use super::pagination::Pagination;
use crate::crm::{ItemFilter, ItemStore, UserFilter};
use crate::error::ApiError;
use crate::model::employee::Employee;
use crate::model::work_item::{EmployeeId, WorkItemKind};
use crate::transform;

/// Read-only view of active CRM users with their assigned tickets.
pub struct EmployeeService {
    store: Arc<dyn ItemStore>,
    max_concurrent_lookups: usize,
}

impl EmployeeService {
    pub fn new(store: Arc<dyn ItemStore>, max_concurrent_lookups: usize) -> Self {
        Self {
            store,
            max_concurrent_lookups: max_concurrent_lookups.max(1),
        }
    }

    pub async fn handle(&self, ctx: &RequestContext) -> Result<Value, ApiError> {
        match (&ctx.method, ctx.id.as_deref()) {
            (Method::Get, Some(id)) => self.get_one(id).await,
            (Method::Get, None) => {
                self.list(Pagination::from_params(ctx.param("page"), ctx.param("limit")))
                    .await
            }
            _ => Err(ApiError::MethodNotAllowed),
        }
    }

    async fn list(&self, pagination: Pagination) -> Result<Value, ApiError> {
        let users = self.store.list_all_users(&UserFilter::default()).await?;
        let total = users.len() as u64;
        let page: Vec<_> = users
            .into_iter()
            .skip(pagination.offset())
            .take(pagination.limit as usize)
            .collect();
        let employees = self.with_tickets(page).await?;

        Ok(json!({
            "message": "Fetched all employees",
            "employees": employees,
            "pagination": pagination.info(total),
        }))
    }

    async fn get_one(&self, id: &str) -> Result<Value, ApiError> {
        let users = self
            .store
            .list_all_users(&UserFilter {
                id: Some(id.to_string()),
            })
            .await?;
        let user = users
            .into_iter()
            .find(|u| Employee::from_user(u).id == id)
            .ok_or_else(|| ApiError::not_found("Employee not found"))?;
        let employee = self
            .with_tickets(vec![user])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found("Employee not found"))?;

        Ok(json!({
            "message": format!("Fetched employee with ID {id}"),
            "employee": employee,
        }))
    }

    async fn with_tickets(&self, users: Vec<Map<String, Value>>) -> anyhow::Result<Vec<Employee>> {
        let store = &self.store;
        stream::iter(users)
            .map(|user| async move {
                let mut employee = Employee::from_user(&user);
                if let Ok(employee_id) = employee.id.parse::<EmployeeId>() {
                    let raws = store
                        .list_all_items(WorkItemKind::Ticket, &ItemFilter::assigned_to(employee_id))
                        .await?;
                    employee.tickets = transform::decode_all(WorkItemKind::Ticket, &raws);
                }
                Ok::<_, anyhow::Error>(employee)
            })
            .buffered(self.max_concurrent_lookups)
            .try_collect()
            .await
    }
}
