//! Notion-style document store client.
//!
//! Tasks live as pages in one database; the three tag taxonomies are the
//! multi-select options of that database's schema. The engine treats HTTP
//! 200 as the only success signal — the store offers no finer error
//! taxonomy, so anything else becomes a generic [`StoreError`].

use serde_json::{json, Value};
use tracing::debug;

use super::{StoreError, TaskDraft, TaskSnapshot, TaskStore};
use crate::taxonomy::Taxonomy;
use crate::validate::fields::FieldUpdate;

const API_VERSION: &str = "2022-06-28";
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// ISO-8601 serialization of the canonical instant (no offset — the value is
/// already in the reference timezone).
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ─── Database property names ─────────────────────────────────────────────────

const PROP_TASK: &str = "Task";
const PROP_DESCRIPTION: &str = "Description";
const PROP_DATE: &str = "Date";
const PROP_ASSIGNED_TO: &str = "Assigned To";
const PROP_ASSIGNED_BY: &str = "Assigned By";
const PROP_TYPE: &str = "Type";
const PROP_COMPLETION: &str = "Completion";

/// HTTP client for the external store.
pub struct NotionStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
    database_id: String,
}

impl NotionStore {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        database_id: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token: token.into(),
            database_id: database_id.into(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .header("Notion-Version", API_VERSION)
    }

    /// Status 200 is the store's only success signal.
    async fn expect_ok(resp: reqwest::Response) -> Result<Value, StoreError> {
        let status = resp.status().as_u16();
        if status != 200 {
            return Err(StoreError::Status(status));
        }
        Ok(resp.json().await?)
    }

    /// Query every page in the task database.
    async fn query_pages(&self) -> Result<Vec<Value>, StoreError> {
        let resp = self
            .request(
                reqwest::Method::POST,
                &format!("/v1/databases/{}/query", self.database_id),
            )
            .json(&json!({}))
            .send()
            .await?;
        let body = Self::expect_ok(resp).await?;
        match body.get("results").and_then(Value::as_array) {
            Some(results) => Ok(results.clone()),
            None => Err(StoreError::Payload("query response has no results".into())),
        }
    }

    /// Find a page by task name, case-insensitively. Returns its page id and
    /// the raw page.
    async fn find_page(&self, name: &str) -> Result<(String, Value), StoreError> {
        let lowered = name.to_lowercase();
        for page in self.query_pages().await? {
            if let Some(title) = page_title(&page) {
                if title.to_lowercase() == lowered {
                    let id = page
                        .get("id")
                        .and_then(Value::as_str)
                        .ok_or_else(|| StoreError::Payload("page has no id".into()))?
                        .to_string();
                    return Ok((id, page));
                }
            }
        }
        Err(StoreError::NotFound(name.to_string()))
    }
}

#[async_trait::async_trait]
impl TaskStore for NotionStore {
    async fn read_all(&self) -> Result<Vec<TaskSnapshot>, StoreError> {
        let pages = self.query_pages().await?;
        debug!(count = pages.len(), "read task pages from store");
        pages.iter().map(snapshot_from_page).collect()
    }

    async fn get(&self, name: &str) -> Result<TaskSnapshot, StoreError> {
        let (_, page) = self.find_page(name).await?;
        snapshot_from_page(&page)
    }

    async fn create(&self, draft: &TaskDraft) -> Result<(), StoreError> {
        let resp = self
            .request(reqwest::Method::POST, "/v1/pages")
            .json(&json!({
                "parent": { "database_id": self.database_id },
                "properties": {
                    (PROP_TASK): { "title": [{ "text": { "content": draft.name } }] },
                    (PROP_DESCRIPTION): { "rich_text": [{ "text": { "content": draft.description } }] },
                    (PROP_DATE): { "date": { "start": draft.date_time.format(ISO_FORMAT).to_string() } },
                    (PROP_ASSIGNED_TO): { "multi_select": tag_objects(&draft.assigned_to) },
                    (PROP_ASSIGNED_BY): { "multi_select": tag_objects(&draft.assigned_by) },
                    (PROP_TYPE): { "multi_select": tag_objects(&draft.task_type) },
                    (PROP_COMPLETION): { "checkbox": false },
                },
            }))
            .send()
            .await?;
        Self::expect_ok(resp).await?;
        Ok(())
    }

    async fn update(&self, name: &str, update: &FieldUpdate) -> Result<(), StoreError> {
        let (page_id, _) = self.find_page(name).await?;
        let (property, payload) = property_payload(update);
        let resp = self
            .request(reqwest::Method::PATCH, &format!("/v1/pages/{page_id}"))
            .json(&json!({ "properties": { (property): payload } }))
            .send()
            .await?;
        Self::expect_ok(resp).await?;
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let (page_id, _) = self.find_page(name).await?;
        let resp = self
            .request(reqwest::Method::PATCH, &format!("/v1/pages/{page_id}"))
            .json(&json!({ "archived": true }))
            .send()
            .await?;
        Self::expect_ok(resp).await?;
        Ok(())
    }

    async fn read_taxonomy(&self) -> Result<Taxonomy, StoreError> {
        let resp = self
            .request(
                reqwest::Method::GET,
                &format!("/v1/databases/{}", self.database_id),
            )
            .send()
            .await?;
        let body = Self::expect_ok(resp).await?;
        Ok(Taxonomy {
            assign_to: schema_options(&body, PROP_ASSIGNED_TO),
            assign_by: schema_options(&body, PROP_ASSIGNED_BY),
            task_type: schema_options(&body, PROP_TYPE),
        })
    }
}

// ─── Wire parsing helpers ────────────────────────────────────────────────────

fn page_title(page: &Value) -> Option<&str> {
    page["properties"][PROP_TASK]["title"][0]["text"]["content"].as_str()
}

fn rich_text(page: &Value, property: &str) -> String {
    page["properties"][property]["rich_text"][0]["text"]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

fn multi_select_names(page: &Value, property: &str) -> Vec<String> {
    page["properties"][property]["multi_select"]
        .as_array()
        .map(|tags| {
            tags.iter()
                .filter_map(|tag| tag["name"].as_str())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn snapshot_from_page(page: &Value) -> Result<TaskSnapshot, StoreError> {
    let name = page_title(page)
        .ok_or_else(|| StoreError::Payload("page has no task title".into()))?
        .to_string();
    Ok(TaskSnapshot {
        name,
        description: rich_text(page, PROP_DESCRIPTION),
        date_time: page["properties"][PROP_DATE]["date"]["start"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        assigned_to: multi_select_names(page, PROP_ASSIGNED_TO),
        assigned_by: multi_select_names(page, PROP_ASSIGNED_BY),
        task_type: multi_select_names(page, PROP_TYPE),
        completion: page["properties"][PROP_COMPLETION]["checkbox"]
            .as_bool()
            .unwrap_or(false),
        url: page["url"].as_str().unwrap_or_default().to_string(),
    })
}

/// Multi-select options of one schema property.
fn schema_options(database: &Value, property: &str) -> Vec<String> {
    database["properties"][property]["multi_select"]["options"]
        .as_array()
        .map(|options| {
            options
                .iter()
                .filter_map(|option| option["name"].as_str())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn tag_objects(tags: &[String]) -> Vec<Value> {
    tags.iter().map(|tag| json!({ "name": tag })).collect()
}

/// Map a [`FieldUpdate`] to the property name and payload the store expects.
fn property_payload(update: &FieldUpdate) -> (&'static str, Value) {
    match update {
        FieldUpdate::Name(name) => (PROP_TASK, json!({ "title": [{ "text": { "content": name } }] })),
        FieldUpdate::Description(text) => (
            PROP_DESCRIPTION,
            json!({ "rich_text": [{ "text": { "content": text } }] }),
        ),
        FieldUpdate::DateTime(instant) => (
            PROP_DATE,
            json!({ "date": { "start": instant.format(ISO_FORMAT).to_string() } }),
        ),
        FieldUpdate::AssignedTo(tags) => (PROP_ASSIGNED_TO, json!({ "multi_select": tag_objects(tags) })),
        FieldUpdate::AssignedBy(tags) => (PROP_ASSIGNED_BY, json!({ "multi_select": tag_objects(tags) })),
        FieldUpdate::TaskType(tags) => (PROP_TYPE, json!({ "multi_select": tag_objects(tags) })),
        FieldUpdate::Completion(done) => (PROP_COMPLETION, json!({ "checkbox": done })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_page() -> Value {
        json!({
            "id": "page-1",
            "url": "https://store.example/page-1",
            "properties": {
                "Task": { "title": [{ "text": { "content": "Report" } }] },
                "Description": { "rich_text": [{ "text": { "content": "weekly status" } }] },
                "Date": { "date": { "start": "2030-01-01T09:00:00" } },
                "Assigned To": { "multi_select": [{ "name": "Alice" }] },
                "Assigned By": { "multi_select": [{ "name": "Lead" }] },
                "Type": { "multi_select": [{ "name": "Chore" }, { "name": "Report" }] },
                "Completion": { "checkbox": false },
            },
        })
    }

    #[test]
    fn parses_a_full_page() {
        let snapshot = snapshot_from_page(&sample_page()).unwrap();
        assert_eq!(snapshot.name, "Report");
        assert_eq!(snapshot.description, "weekly status");
        assert_eq!(snapshot.date_time, "2030-01-01T09:00:00");
        assert_eq!(snapshot.assigned_to, ["Alice"]);
        assert_eq!(snapshot.assigned_by, ["Lead"]);
        assert_eq!(snapshot.task_type, ["Chore", "Report"]);
        assert!(!snapshot.completion);
        assert_eq!(snapshot.url, "https://store.example/page-1");
    }

    #[test]
    fn page_without_title_is_a_payload_error() {
        let page = json!({ "id": "page-2", "properties": {} });
        assert!(matches!(
            snapshot_from_page(&page),
            Err(StoreError::Payload(_))
        ));
    }

    #[test]
    fn schema_options_read_multi_select_lists() {
        let database = json!({
            "properties": {
                "Assigned To": { "multi_select": { "options": [
                    { "name": "Alice" }, { "name": "Bob" },
                ] } },
                "Assigned By": { "multi_select": { "options": [] } },
            },
        });
        assert_eq!(schema_options(&database, "Assigned To"), ["Alice", "Bob"]);
        assert!(schema_options(&database, "Assigned By").is_empty());
        assert!(schema_options(&database, "Type").is_empty());
    }

    #[test]
    fn field_updates_map_to_store_properties() {
        let (property, payload) = property_payload(&FieldUpdate::Completion(true));
        assert_eq!(property, "Completion");
        assert_eq!(payload, json!({ "checkbox": true }));

        let (property, payload) =
            property_payload(&FieldUpdate::AssignedTo(vec!["Alice".to_string()]));
        assert_eq!(property, "Assigned To");
        assert_eq!(payload, json!({ "multi_select": [{ "name": "Alice" }] }));
    }
}
