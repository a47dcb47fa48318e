//! Code tables translating between the CRM's numeric enum codes and the
//! labels shown by the public API.
//!
//! Tables are process-wide constants. Decoding is total (unknown codes become
//! [`UNKNOWN_LABEL`]); encoding is partial and returns `None` for labels the
//! table does not know.

use serde_json::Value;

use crate::model::work_item::{EmployeeId, WorkItemKind};

/// Label produced for a code that no table entry covers.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Category used when a requested category has no eligible-employee entry.
pub const FALLBACK_CATEGORY: &str = "Other";

#[derive(Debug)]
pub struct CodeTable {
    pub name: &'static str,
    entries: &'static [(i64, &'static str)],
}

impl CodeTable {
    pub const fn new(name: &'static str, entries: &'static [(i64, &'static str)]) -> Self {
        Self { name, entries }
    }

    pub fn decode(&self, code: i64) -> &'static str {
        self.entries
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, label)| *label)
            .unwrap_or(UNKNOWN_LABEL)
    }

    /// Decode a raw CRM value, which may arrive as a number or a numeric string.
    pub fn decode_value(&self, raw: &Value) -> &'static str {
        match code_from_value(raw) {
            Some(code) => self.decode(code),
            None => UNKNOWN_LABEL,
        }
    }

    pub fn encode(&self, label: &str) -> Option<i64> {
        self.entries
            .iter()
            .find(|(_, l)| *l == label)
            .map(|(code, _)| *code)
    }

    #[cfg(test)]
    pub fn codes(&self) -> impl Iterator<Item = i64> + '_ {
        self.entries.iter().map(|(code, _)| *code)
    }

    #[cfg(test)]
    pub fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(_, label)| *label)
    }
}

/// Parse an enum code out of a raw CRM value.
pub fn code_from_value(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub static PRIORITIES: CodeTable = CodeTable::new(
    "priority",
    &[(1173, "Low"), (1175, "Medium"), (1177, "High")],
);

pub static TICKET_STATUSES: CodeTable = CodeTable::new(
    "status",
    &[
        (1189, "Open"),
        (1191, "In Progress"),
        (1193, "Resolved"),
        (1195, "Closed"),
    ],
);

pub static BUG_STATUSES: CodeTable = CodeTable::new(
    "status",
    &[
        (1189, "Open"),
        (1191, "In Progress"),
        (1193, "Resolved"),
        (1195, "Closed"),
        (1219, "Reopened"),
    ],
);

pub static TICKET_CATEGORIES: CodeTable = CodeTable::new(
    "category",
    &[
        (1179, "Technical Support"),
        (1181, "Billing"),
        (1183, "Feature Request"),
        (1185, "Account Access"),
        (1187, "Other"),
    ],
);

pub static BUG_CATEGORIES: CodeTable = CodeTable::new(
    "category",
    &[
        (1179, "Technical Support"),
        (1181, "Billing"),
        (1183, "Feature Request"),
        (1185, "Account Access"),
        (1187, "Other"),
    ],
);

pub static SEVERITIES: CodeTable = CodeTable::new(
    "severity",
    &[
        (1211, "Critical"),
        (1213, "Major"),
        (1215, "Minor"),
        (1217, "Trivial"),
    ],
);

pub static EMPLOYEES: CodeTable = CodeTable::new(
    "employee",
    &[
        (1, "Vortexweb (Ishika)"),
        (55, "Chetan"),
        (201, "Aaryan"),
        (205, "Muhammed Fasil K"),
        (229, "Rohan Pachauri"),
        (235, "Ajzal"),
        (245, "Devi Krishna"),
        (273, "Deshraj Singh"),
    ],
);

/// Status label to workflow stage id. Keeps the CRM pipeline stage in step
/// with the status shown to clients.
#[derive(Debug)]
pub struct StageMap {
    entries: &'static [(&'static str, &'static str)],
}

impl StageMap {
    pub fn stage_for(&self, status: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(label, _)| *label == status)
            .map(|(_, stage)| *stage)
    }
}

pub static STAGES: StageMap = StageMap {
    entries: &[
        ("Open", "DT1430_223:NEW"),
        ("In Progress", "DT1430_223:PREPARATION"),
        ("Resolved", "DT1430_223:CLIENT"),
        ("Closed", "DT1430_223:UC_W759PK"),
        ("Reopened", "DT1430_223:NEW"),
    ],
};

/// Category label to the employees allowed to receive new work in it,
/// in preference order.
#[derive(Debug)]
pub struct EligibilityMap {
    entries: &'static [(&'static str, &'static [EmployeeId])],
}

impl EligibilityMap {
    /// Eligible employees for `category`, falling back to the
    /// [`FALLBACK_CATEGORY`] list for unrecognised categories.
    pub fn eligible_for(&self, category: &str) -> &'static [EmployeeId] {
        self.lookup(category)
            .or_else(|| self.lookup(FALLBACK_CATEGORY))
            .unwrap_or(&[])
    }

    fn lookup(&self, category: &str) -> Option<&'static [EmployeeId]> {
        self.entries
            .iter()
            .find(|(label, _)| *label == category)
            .map(|(_, ids)| *ids)
    }
}

pub static RESPONSIBLE: EligibilityMap = EligibilityMap {
    entries: &[
        ("Technical Support", &[1]),
        ("Billing", &[1, 55]),
        ("Feature Request", &[1, 201, 205, 229, 235, 245, 273]),
        ("Account Access", &[1]),
        ("Other", &[1]),
    ],
};

/// All tables that apply to one work item kind.
#[derive(Debug)]
pub struct MappingSet {
    pub status: &'static CodeTable,
    pub priority: &'static CodeTable,
    pub category: &'static CodeTable,
    pub severity: Option<&'static CodeTable>,
    pub employees: &'static CodeTable,
    pub stages: &'static StageMap,
    pub responsible: &'static EligibilityMap,
}

static TICKET_MAPPINGS: MappingSet = MappingSet {
    status: &TICKET_STATUSES,
    priority: &PRIORITIES,
    category: &TICKET_CATEGORIES,
    severity: None,
    employees: &EMPLOYEES,
    stages: &STAGES,
    responsible: &RESPONSIBLE,
};

static BUG_MAPPINGS: MappingSet = MappingSet {
    status: &BUG_STATUSES,
    priority: &PRIORITIES,
    category: &BUG_CATEGORIES,
    severity: Some(&SEVERITIES),
    employees: &EMPLOYEES,
    stages: &STAGES,
    responsible: &RESPONSIBLE,
};

pub fn mappings(kind: WorkItemKind) -> &'static MappingSet {
    match kind {
        WorkItemKind::Ticket => &TICKET_MAPPINGS,
        WorkItemKind::Bug => &BUG_MAPPINGS,
    }
}
