//! Conversion between raw CRM item records and the public ticket/bug schema.

use serde_json::{Map, Value};
use tracing::warn;

use crate::mapping::{mappings, CodeTable, MappingSet};
use crate::model::work_item::{id_to_string, PublicRecord, RawFields, RawRecord, WorkItemKind};
use crate::util::dates::format_crm_timestamp;

/// CRM field holding the responsible employee.
pub const ASSIGNEE_FIELD: &str = "assignedById";

/// CRM field holding the workflow stage.
pub const STAGE_FIELD: &str = "stageId";

/// CRM field holding the category code, shared by both kinds.
pub const CATEGORY_FIELD: &str = "ufCrm197Category";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Id,
    Text,
    Priority,
    Status,
    Category,
    Severity,
    Assignee,
    Timestamp,
}

#[derive(Debug)]
pub struct FieldSpec {
    /// Key in decoded output.
    pub public: &'static str,
    /// Key accepted in create/update payloads. `None` for read-only fields.
    pub input: Option<&'static str>,
    /// Key in the CRM record.
    pub raw: &'static str,
    pub kind: FieldKind,
}

const fn field(
    public: &'static str,
    input: Option<&'static str>,
    raw: &'static str,
    kind: FieldKind,
) -> FieldSpec {
    FieldSpec {
        public,
        input,
        raw,
        kind,
    }
}

#[derive(Debug)]
pub struct Schema {
    pub fields: &'static [FieldSpec],
    /// Input keys that must be present and non-empty on create.
    pub required: &'static [&'static str],
    pub required_message: &'static str,
}

impl Schema {
    pub fn by_input(&self, input: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.input == Some(input))
    }
}

static TICKET_SCHEMA: Schema = Schema {
    fields: &[
        field("id", None, "id", FieldKind::Id),
        field("title", Some("title"), "ufCrm197Title", FieldKind::Text),
        field("description", Some("description"), "ufCrm197Description", FieldKind::Text),
        field("priority", Some("priority"), "ufCrm197Priority", FieldKind::Priority),
        field("category", Some("category"), CATEGORY_FIELD, FieldKind::Category),
        field("status", Some("status"), "ufCrm197Status", FieldKind::Status),
        field("attachments", Some("attachments"), "ufCrm197Attachments", FieldKind::Text),
        field("comments", Some("comments"), "ufCrm197Comments", FieldKind::Text),
        field("plannedHours", Some("planned_hours"), "ufCrm197PlannedHours", FieldKind::Text),
        field("clientName", Some("client_name"), "ufCrm197ClientName", FieldKind::Text),
        field("companyName", Some("company_name"), "ufCrm197CompanyName", FieldKind::Text),
        field("clientEmail", Some("client_email"), "ufCrm197ClientEmail", FieldKind::Text),
        field("portalUrl", Some("portal_url"), "ufCrm197PortalUrl", FieldKind::Text),
        field("assignedTo", Some("assigned_to"), ASSIGNEE_FIELD, FieldKind::Assignee),
        field("createdTime", None, "createdTime", FieldKind::Timestamp),
        field("updatedTime", None, "updatedTime", FieldKind::Timestamp),
    ],
    required: &["title", "client_name"],
    required_message: "Title and Client Name are required",
};

static BUG_SCHEMA: Schema = Schema {
    fields: &[
        field("id", None, "id", FieldKind::Id),
        field("title", Some("title"), "ufCrm197Title", FieldKind::Text),
        field("description", Some("description"), "ufCrm197Description", FieldKind::Text),
        field("priority", Some("priority"), "ufCrm197Priority", FieldKind::Priority),
        field("severity", Some("severity"), "ufCrm197Severity", FieldKind::Severity),
        field("category", Some("category"), CATEGORY_FIELD, FieldKind::Category),
        field("status", Some("status"), "ufCrm197Status", FieldKind::Status),
        field("reported_by", Some("reported_by"), "ufCrm197ReportedBy", FieldKind::Text),
        field("environment", Some("environment"), "ufCrm197Env", FieldKind::Text),
        field("attachments", Some("attachments"), "ufCrm197Attachments", FieldKind::Text),
        field("portalUrl", Some("portal_url"), "ufCrm197PortalUrl", FieldKind::Text),
        field("date_found", Some("date_found"), "ufCrm197DateFound", FieldKind::Text),
        field(
            "steps_to_reproduce",
            Some("steps_to_reproduce"),
            "ufCrm197StepsToReproduce",
            FieldKind::Text,
        ),
        field("expected_result", Some("expected_result"), "ufCrm197ExpectedResult", FieldKind::Text),
        field("actual_result", Some("actual_result"), "ufCrm197ActualResult", FieldKind::Text),
        field("logs", Some("logs"), "ufCrm197Logs", FieldKind::Text),
        field("assignedTo", Some("assigned_to"), ASSIGNEE_FIELD, FieldKind::Assignee),
        field("createdTime", None, "createdTime", FieldKind::Timestamp),
        field("updatedTime", None, "updatedTime", FieldKind::Timestamp),
    ],
    required: &["title", "reported_by"],
    required_message: "Title and Reported By are required",
};

pub fn schema(kind: WorkItemKind) -> &'static Schema {
    match kind {
        WorkItemKind::Ticket => &TICKET_SCHEMA,
        WorkItemKind::Bug => &BUG_SCHEMA,
    }
}

fn code_table(set: &MappingSet, kind: FieldKind) -> Option<&'static CodeTable> {
    match kind {
        FieldKind::Priority => Some(set.priority),
        FieldKind::Status => Some(set.status),
        FieldKind::Category => Some(set.category),
        FieldKind::Severity => set.severity,
        FieldKind::Assignee => Some(set.employees),
        FieldKind::Id | FieldKind::Text | FieldKind::Timestamp => None,
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Decode one raw CRM record into the public schema. Absent raw fields decode
/// to `""`, so every schema key is present in the output.
pub fn decode(kind: WorkItemKind, raw: &RawRecord) -> PublicRecord {
    let set = mappings(kind);
    let mut out = Map::new();

    for spec in schema(kind).fields {
        let value = match (present(raw.get(spec.raw)), spec.kind) {
            (None, _) => Value::from(""),
            (Some(v), FieldKind::Id) => Value::from(id_to_string(v)),
            (Some(v), FieldKind::Text) => v.clone(),
            (Some(v), FieldKind::Timestamp) => Value::from(
                v.as_str()
                    .and_then(format_crm_timestamp)
                    .unwrap_or_default(),
            ),
            (Some(v), other) => match code_table(set, other) {
                Some(table) => Value::from(table.decode_value(v)),
                None => Value::from(""),
            },
        };
        out.insert(spec.public.to_string(), value);
    }

    out
}

pub fn decode_all(kind: WorkItemKind, raws: &[RawRecord]) -> Vec<PublicRecord> {
    raws.iter().map(|raw| decode(kind, raw)).collect()
}

/// Label of the category stored on a raw record, if it has one.
pub fn decode_category(kind: WorkItemKind, raw: &RawRecord) -> Option<&'static str> {
    present(raw.get(CATEGORY_FIELD)).map(|v| mappings(kind).category.decode_value(v))
}

/// Encode a partial public payload into CRM fields. Only keys the caller
/// supplied with a non-null value are emitted. Enum labels without a code are
/// dropped. A recognised status also sets the matching workflow stage.
pub fn encode(kind: WorkItemKind, input: &Map<String, Value>) -> RawFields {
    let set = mappings(kind);
    let mut fields = Map::new();

    for spec in schema(kind).fields {
        let Some(name) = spec.input else { continue };
        let Some(value) = present(input.get(name)) else {
            continue;
        };

        match spec.kind {
            FieldKind::Text | FieldKind::Assignee => {
                fields.insert(spec.raw.to_string(), value.clone());
            }
            FieldKind::Priority | FieldKind::Status | FieldKind::Category | FieldKind::Severity => {
                let code = code_table(set, spec.kind)
                    .and_then(|table| value.as_str().and_then(|label| table.encode(label)));
                match code {
                    Some(code) => {
                        fields.insert(spec.raw.to_string(), Value::from(code));
                    }
                    None => warn!(
                        kind = %kind,
                        field = name,
                        value = %value,
                        "dropping unmapped label"
                    ),
                }
            }
            FieldKind::Id | FieldKind::Timestamp => {}
        }
    }

    if let Some(stage) = input
        .get("status")
        .and_then(Value::as_str)
        .and_then(|status| set.stages.stage_for(status))
    {
        fields.insert(STAGE_FIELD.to_string(), Value::from(stage));
    }

    fields
}

/// Input keys from the schema's required list that are missing or empty in
/// the encoded field set.
pub fn missing_required(kind: WorkItemKind, fields: &RawFields) -> Vec<&'static str> {
    let schema = schema(kind);
    schema
        .required
        .iter()
        .copied()
        .filter(|name| {
            let raw = schema.by_input(name).map(|f| f.raw);
            let value = raw.and_then(|raw| present(fields.get(raw)));
            match value {
                None => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn decode_fills_every_key_for_empty_record() {
        for kind in WorkItemKind::ALL {
            let out = decode(kind, &Map::new());
            assert_eq!(out.len(), schema(kind).fields.len());
            for (key, value) in &out {
                assert_eq!(value, &json!(""), "{kind} field {key}");
            }
        }
    }

    #[test]
    fn decode_maps_codes_to_labels() {
        let raw = obj(json!({
            "id": 17,
            "ufCrm197Title": "Login broken",
            "ufCrm197Priority": 1177,
            "ufCrm197Category": "1181",
            "ufCrm197Status": 1195,
            "assignedById": 55,
            "createdTime": "2024-05-01T10:15:30+03:00"
        }));
        let out = decode(WorkItemKind::Ticket, &raw);
        assert_eq!(out["id"], json!("17"));
        assert_eq!(out["title"], json!("Login broken"));
        assert_eq!(out["priority"], json!("High"));
        assert_eq!(out["category"], json!("Billing"));
        assert_eq!(out["status"], json!("Closed"));
        assert_eq!(out["assignedTo"], json!("Chetan"));
        assert_eq!(out["createdTime"], json!("2024-05-01 10:15:30"));
        assert_eq!(out["updatedTime"], json!(""));
    }

    #[test]
    fn decode_keeps_public_key_order() {
        let out = decode(WorkItemKind::Bug, &Map::new());
        let keys: Vec<&str> = out.keys().map(String::as_str).collect();
        let expected: Vec<&str> = BUG_SCHEMA.fields.iter().map(|f| f.public).collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn decode_unknown_code_and_bad_timestamp() {
        let raw = obj(json!({
            "ufCrm197Priority": 9999,
            "ufCrm197Severity": 1211,
            "updatedTime": "not a date"
        }));
        let out = decode(WorkItemKind::Bug, &raw);
        assert_eq!(out["priority"], json!("Unknown"));
        assert_eq!(out["severity"], json!("Critical"));
        assert_eq!(out["updatedTime"], json!(""));
    }

    #[test]
    fn decode_treats_null_as_absent() {
        let out = decode(WorkItemKind::Ticket, &obj(json!({ "ufCrm197Status": null })));
        assert_eq!(out["status"], json!(""));
    }

    #[test]
    fn bug_logs_come_from_crm_field() {
        let out = decode(WorkItemKind::Bug, &obj(json!({ "ufCrm197Logs": "stack trace" })));
        assert_eq!(out["logs"], json!("stack trace"));
    }

    #[test]
    fn encode_only_emits_supplied_fields() {
        let fields = encode(
            WorkItemKind::Ticket,
            &obj(json!({ "title": "Login broken", "client_name": "Acme", "comments": null })),
        );
        assert_eq!(
            fields,
            obj(json!({ "ufCrm197Title": "Login broken", "ufCrm197ClientName": "Acme" }))
        );
    }

    #[test]
    fn encode_status_sets_stage() {
        let fields = encode(WorkItemKind::Ticket, &obj(json!({ "status": "Closed" })));
        assert_eq!(fields["ufCrm197Status"], json!(1195));
        assert_eq!(fields[STAGE_FIELD], json!("DT1430_223:UC_W759PK"));
    }

    #[test]
    fn encode_drops_unmapped_labels() {
        let fields = encode(
            WorkItemKind::Ticket,
            &obj(json!({ "priority": "Urgent", "status": "Nope", "category": 3 })),
        );
        assert!(fields.is_empty());
    }

    #[test]
    fn encode_bug_enums_and_passthrough() {
        let fields = encode(
            WorkItemKind::Bug,
            &obj(json!({
                "severity": "Minor",
                "category": "Billing",
                "status": "Reopened",
                "steps_to_reproduce": "1. log in",
                "assigned_to": 201
            })),
        );
        assert_eq!(fields["ufCrm197Severity"], json!(1215));
        assert_eq!(fields[CATEGORY_FIELD], json!(1181));
        assert_eq!(fields["ufCrm197Status"], json!(1219));
        assert_eq!(fields[STAGE_FIELD], json!("DT1430_223:NEW"));
        assert_eq!(fields["ufCrm197StepsToReproduce"], json!("1. log in"));
        assert_eq!(fields[ASSIGNEE_FIELD], json!(201));
    }

    #[test]
    fn ticket_ignores_severity_input() {
        let fields = encode(WorkItemKind::Ticket, &obj(json!({ "severity": "Major" })));
        assert!(fields.is_empty());
    }

    #[test]
    fn missing_required_reports_empty_and_absent() {
        let fields = encode(WorkItemKind::Ticket, &obj(json!({ "title": "  " })));
        assert_eq!(missing_required(WorkItemKind::Ticket, &fields), vec!["title", "client_name"]);

        let fields = encode(WorkItemKind::Bug, &obj(json!({ "title": "x", "reported_by": "QA" })));
        assert!(missing_required(WorkItemKind::Bug, &fields).is_empty());
    }

    #[test]
    fn decode_category_reads_stored_code() {
        let raw = obj(json!({ "ufCrm197Category": 1183 }));
        assert_eq!(decode_category(WorkItemKind::Ticket, &raw), Some("Feature Request"));
        assert_eq!(decode_category(WorkItemKind::Ticket, &Map::new()), None);
    }
}
