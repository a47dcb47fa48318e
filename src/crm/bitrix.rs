use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{ItemFilter, ItemPage, ItemStore, PageRequest, UserFilter, UserPage};
use crate::config::CrmConfig;
use crate::model::employee::USER_SELECT;
use crate::model::work_item::{RawFields, RawRecord, WorkItemKind};

const NOT_FOUND: &str = "NOT_FOUND";

/// Bitrix24 REST client speaking to an inbound webhook.
pub struct BitrixClient {
    webhook_url: String,
    tickets_entity_type_id: u32,
    bugs_entity_type_id: u32,
    client: reqwest::Client,
}

impl BitrixClient {
    pub fn new(config: &CrmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build CRM HTTP client")?;
        Ok(Self {
            webhook_url: config.webhook_url.trim_end_matches('/').to_string(),
            tickets_entity_type_id: config.tickets_entity_type_id,
            bugs_entity_type_id: config.bug_entity_type(),
            client,
        })
    }

    fn entity_type_id(&self, kind: WorkItemKind) -> u32 {
        match kind {
            WorkItemKind::Ticket => self.tickets_entity_type_id,
            WorkItemKind::Bug => self.bugs_entity_type_id,
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<BitrixResponse> {
        debug!(method, "calling CRM");
        let resp = self
            .client
            .post(format!("{}/{method}.json", self.webhook_url))
            .json(&params)
            .send()
            .await
            .with_context(|| format!("CRM request {method} failed"))?;

        let status = resp.status();
        let body: BitrixResponse = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse CRM response for {method} (HTTP {status})"))?;
        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct BitrixResponse {
    result: Option<Value>,
    total: Option<u64>,
    next: Option<u64>,
    error: Option<String>,
    error_description: Option<String>,
}

impl BitrixResponse {
    fn is_not_found(&self) -> bool {
        self.error.as_deref() == Some(NOT_FOUND)
    }

    fn into_result(self, method: &str) -> Result<Value> {
        if let Some(code) = self.error {
            let description = self.error_description.unwrap_or_default();
            if description.is_empty() {
                bail!("{method} failed: {code}");
            }
            bail!("{method} failed: {description} ({code})");
        }
        self.result
            .with_context(|| format!("{method} returned no result"))
    }
}

fn item_from_result(result: &Value) -> Option<RawRecord> {
    result.get("item").and_then(Value::as_object).cloned()
}

fn items_from_result(result: &Value) -> Vec<RawRecord> {
    result
        .get("items")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|i| i.as_object().cloned()).collect())
        .unwrap_or_default()
}

fn users_from_result(result: &Value) -> Vec<Map<String, Value>> {
    result
        .as_array()
        .map(|users| users.iter().filter_map(|u| u.as_object().cloned()).collect())
        .unwrap_or_default()
}

#[async_trait]
impl ItemStore for BitrixClient {
    async fn list_items(
        &self,
        kind: WorkItemKind,
        filter: &ItemFilter,
        page: PageRequest,
    ) -> Result<ItemPage> {
        let mut params = json!({
            "entityTypeId": self.entity_type_id(kind),
            "select": ["*"],
            "start": page.offset(),
            "limit": page.limit,
        });
        if let Some(employee) = filter.assigned_to {
            params["filter"] = json!({ "ASSIGNED_BY_ID": employee });
        }

        let resp = self.call("crm.item.list", params).await?;
        let total = resp.total.unwrap_or(0);
        let result = resp.into_result("crm.item.list")?;
        Ok(ItemPage {
            items: items_from_result(&result),
            total,
        })
    }

    async fn get_item(&self, kind: WorkItemKind, id: &str) -> Result<Option<RawRecord>> {
        let resp = self
            .call(
                "crm.item.get",
                json!({ "entityTypeId": self.entity_type_id(kind), "id": id }),
            )
            .await?;
        if resp.is_not_found() {
            return Ok(None);
        }
        let result = resp.into_result("crm.item.get")?;
        Ok(item_from_result(&result))
    }

    async fn create_item(&self, kind: WorkItemKind, fields: &RawFields) -> Result<RawRecord> {
        let resp = self
            .call(
                "crm.item.add",
                json!({ "entityTypeId": self.entity_type_id(kind), "fields": fields }),
            )
            .await?;
        let result = resp.into_result("crm.item.add")?;
        item_from_result(&result).context("crm.item.add returned no item")
    }

    async fn update_item(
        &self,
        kind: WorkItemKind,
        id: &str,
        fields: &RawFields,
    ) -> Result<RawRecord> {
        let resp = self
            .call(
                "crm.item.update",
                json!({ "entityTypeId": self.entity_type_id(kind), "id": id, "fields": fields }),
            )
            .await?;
        let result = resp.into_result("crm.item.update")?;
        item_from_result(&result).context("crm.item.update returned no item")
    }

    async fn delete_item(&self, kind: WorkItemKind, id: &str) -> Result<bool> {
        let resp = self
            .call(
                "crm.item.delete",
                json!({ "entityTypeId": self.entity_type_id(kind), "id": id }),
            )
            .await?;
        if resp.is_not_found() {
            return Ok(false);
        }
        if resp.error.is_some() {
            return resp.into_result("crm.item.delete").map(|_| false);
        }
        Ok(resp.result.is_some())
    }

    async fn list_users(&self, filter: &UserFilter, cursor: Option<u64>) -> Result<UserPage> {
        let mut user_filter = json!({ "ACTIVE": "Y" });
        if let Some(id) = &filter.id {
            user_filter["ID"] = Value::from(id.as_str());
        }
        let resp = self
            .call(
                "user.get",
                json!({
                    "filter": user_filter,
                    "select": USER_SELECT,
                    "start": cursor.unwrap_or(0),
                }),
            )
            .await?;
        let next = resp.next;
        let result = resp.into_result("user.get")?;
        Ok(UserPage {
            users: users_from_result(&result),
            next,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(value: Value) -> BitrixResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn list_response_yields_items_and_total() {
        let resp = response(json!({
            "result": { "items": [{ "id": 1 }, { "id": 2 }, "junk"] },
            "total": 12
        }));
        assert_eq!(resp.total, Some(12));
        let result = resp.into_result("crm.item.list").unwrap();
        let items = items_from_result(&result);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["id"], json!(1));
    }

    #[test]
    fn error_envelope_becomes_error_with_description() {
        let resp = response(json!({
            "error": "ACCESS_DENIED",
            "error_description": "Webhook lacks crm scope"
        }));
        let err = resp.into_result("crm.item.add").unwrap_err();
        assert_eq!(
            err.to_string(),
            "crm.item.add failed: Webhook lacks crm scope (ACCESS_DENIED)"
        );
    }

    #[test]
    fn not_found_is_recognised() {
        let resp = response(json!({ "error": "NOT_FOUND", "error_description": "Not found" }));
        assert!(resp.is_not_found());
    }

    #[test]
    fn single_item_and_users_extraction() {
        let item = item_from_result(&json!({ "item": { "id": 7, "ufCrm197Title": "x" } }));
        assert_eq!(item.unwrap()["id"], json!(7));
        assert!(item_from_result(&json!({})).is_none());

        let users = users_from_result(&json!([{ "ID": "1" }, { "ID": "55" }]));
        assert_eq!(users.len(), 2);
        assert!(users_from_result(&json!({})).is_empty());
    }

    #[test]
    fn page_offset_is_zero_based() {
        assert_eq!(PageRequest { page: 1, limit: 50 }.offset(), 0);
        assert_eq!(PageRequest { page: 3, limit: 20 }.offset(), 40);
    }
}
