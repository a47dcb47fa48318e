use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::info;

use super::context::{Method, RequestContext};
use super::pagination::Pagination;
use crate::assignment::AssignmentPolicy;
use crate::crm::{ItemFilter, ItemStore, PageRequest};
use crate::error::ApiError;
use crate::model::work_item::WorkItemKind;
use crate::transform::{self, ASSIGNEE_FIELD};

/// Orchestrates CRUD for one work item kind (tickets or bugs).
pub struct WorkItemService {
    kind: WorkItemKind,
    store: Arc<dyn ItemStore>,
    policy: Arc<AssignmentPolicy>,
}

impl WorkItemService {
    pub fn new(kind: WorkItemKind, store: Arc<dyn ItemStore>, policy: Arc<AssignmentPolicy>) -> Self {
        Self {
            kind,
            store,
            policy,
        }
    }

    pub async fn handle(&self, ctx: &RequestContext) -> Result<Value, ApiError> {
        let name = self.kind.display_name();
        match (&ctx.method, ctx.id.as_deref()) {
            (Method::Get, Some(id)) => self.get_one(id).await,
            (Method::Get, None) => {
                self.list(Pagination::from_params(ctx.param("page"), ctx.param("limit")))
                    .await
            }
            (Method::Post, _) => self.create(&ctx.body).await,
            (Method::Put, Some(id)) => self.update(id, &ctx.body).await,
            (Method::Put, None) => Err(ApiError::bad_request(format!(
                "{name} ID is required for update"
            ))),
            (Method::Delete, Some(id)) => self.delete(id).await,
            (Method::Delete, None) => Err(ApiError::bad_request(format!(
                "{name} ID is required for delete"
            ))),
            (Method::Other(_), _) => Err(ApiError::MethodNotAllowed),
        }
    }

    fn not_found(&self) -> ApiError {
        ApiError::not_found(format!("{} not found", self.kind.display_name()))
    }

    async fn list(&self, pagination: Pagination) -> Result<Value, ApiError> {
        let page = self
            .store
            .list_items(
                self.kind,
                &ItemFilter::default(),
                PageRequest {
                    page: pagination.page,
                    limit: pagination.limit,
                },
            )
            .await?;

        Ok(json!({
            "message": format!("Fetched all {}", self.kind.plural()),
            self.kind.plural(): transform::decode_all(self.kind, &page.items),
            "pagination": pagination.info(page.total),
        }))
    }

    async fn get_one(&self, id: &str) -> Result<Value, ApiError> {
        let raw = self
            .store
            .get_item(self.kind, id)
            .await?
            .ok_or_else(|| self.not_found())?;

        Ok(json!({
            "message": format!("Fetched {} with ID {id}", self.kind.as_str()),
            self.kind.as_str(): transform::decode(self.kind, &raw),
        }))
    }

    async fn create(&self, body: &[u8]) -> Result<Value, ApiError> {
        let input = parse_body(body)?;
        let mut fields = transform::encode(self.kind, &input);

        if !transform::missing_required(self.kind, &fields).is_empty() {
            return Err(ApiError::bad_request(
                transform::schema(self.kind).required_message,
            ));
        }

        if !fields.contains_key(ASSIGNEE_FIELD) {
            if let Some(category) = input.get("category").and_then(Value::as_str) {
                self.assign(&mut fields, category).await?;
            }
        }

        let raw = self.store.create_item(self.kind, &fields).await?;
        Ok(json!({
            "message": format!("{} created successfully", self.kind.display_name()),
            self.kind.as_str(): transform::decode(self.kind, &raw),
        }))
    }

    async fn update(&self, id: &str, body: &[u8]) -> Result<Value, ApiError> {
        let input = parse_body(body)?;
        let mut fields = transform::encode(self.kind, &input);

        let existing = self
            .store
            .get_item(self.kind, id)
            .await?
            .ok_or_else(|| self.not_found())?;

        if let Some(category) = input.get("category").and_then(Value::as_str) {
            if transform::decode_category(self.kind, &existing) != Some(category) {
                self.assign(&mut fields, category).await?;
            }
        }

        let raw = self.store.update_item(self.kind, id, &fields).await?;
        Ok(json!({
            "message": format!("{} with ID {id} updated", self.kind.display_name()),
            self.kind.as_str(): transform::decode(self.kind, &raw),
        }))
    }

    async fn delete(&self, id: &str) -> Result<Value, ApiError> {
        if !self.store.delete_item(self.kind, id).await? {
            return Err(self.not_found());
        }
        Ok(json!({
            "message": format!("{} with ID {id} deleted", self.kind.display_name()),
            "success": true,
        }))
    }

    async fn assign(&self, fields: &mut Map<String, Value>, category: &str) -> Result<(), ApiError> {
        if let Some(employee) = self.policy.assign(self.kind, category).await? {
            info!(kind = %self.kind, category, employee, "auto-assigned");
            fields.insert(ASSIGNEE_FIELD.to_string(), Value::from(employee));
        }
        Ok(())
    }
}

/// Parse a request body as a non-empty JSON object.
pub fn parse_body(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) if !map.is_empty() => Ok(map),
        _ => Err(ApiError::bad_request("Invalid JSON input")),
    }
}
