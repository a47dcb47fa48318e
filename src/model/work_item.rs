use serde_json::{Map, Value};
use std::fmt;

/// A record as stored by the CRM: opaque field names mapped to raw values.
pub type RawRecord = Map<String, Value>;

/// Field set sent to the CRM on create/update. Only keys with a value are present.
pub type RawFields = Map<String, Value>;

/// A work item rendered in the public schema. Every schema key is always present.
pub type PublicRecord = Map<String, Value>;

/// Employee identifier as used by the CRM user API and `assignedById`.
pub type EmployeeId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkItemKind {
    Ticket,
    Bug,
}

impl WorkItemKind {
    pub const ALL: [WorkItemKind; 2] = [WorkItemKind::Ticket, WorkItemKind::Bug];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkItemKind::Ticket => "ticket",
            WorkItemKind::Bug => "bug",
        }
    }

    /// Collection name used for the endpoint and list envelopes.
    pub fn plural(&self) -> &'static str {
        match self {
            WorkItemKind::Ticket => "tickets",
            WorkItemKind::Bug => "bugs",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            WorkItemKind::Ticket => "Ticket",
            WorkItemKind::Bug => "Bug",
        }
    }
}

impl fmt::Display for WorkItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Renders a raw CRM id (numeric or string) as the opaque string exposed publicly.
pub fn id_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}
