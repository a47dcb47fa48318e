use serde::Serialize;
use serde_json::Value;

use super::work_item::{id_to_string, PublicRecord};

/// An active CRM user together with the tickets currently assigned to them.
#[derive(Debug, Clone, Serialize)]
pub struct Employee {
    pub id: String,
    pub fullname: String,
    pub email: String,
    pub phone: String,
    pub position: String,
    pub photo: String,
    pub tickets: Vec<PublicRecord>,
}

/// Custom user field holding the job title.
pub const POSITION_FIELD: &str = "UF_USR_1693993295483";

/// Fields requested from the user API.
pub const USER_SELECT: &[&str] = &[
    "ID",
    "NAME",
    "LAST_NAME",
    "EMAIL",
    "WORK_PHONE",
    POSITION_FIELD,
    "PERSONAL_PHOTO",
];

impl Employee {
    /// Build an employee from a raw `user.get` row. Tickets are attached separately.
    pub fn from_user(user: &serde_json::Map<String, Value>) -> Self {
        let text = |key: &str| -> String {
            match user.get(key) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            }
        };
        let fullname = format!("{} {}", text("NAME"), text("LAST_NAME"))
            .trim()
            .to_string();

        Employee {
            id: user.get("ID").map(id_to_string).unwrap_or_default(),
            fullname,
            email: text("EMAIL"),
            phone: text("WORK_PHONE"),
            position: text(POSITION_FIELD),
            photo: text("PERSONAL_PHOTO"),
            tickets: Vec::new(),
        }
    }
}
