use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Other(String),
}

impl Method {
    pub fn parse(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Other(other) => other,
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Delete)
    }
}

/// Everything an orchestrator needs from one inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub id: Option<String>,
    pub query: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl RequestContext {
    /// Build a context from the raw query map. The `id` parameter is lifted
    /// out; an empty id counts as absent.
    pub fn new(method: Method, query: HashMap<String, String>, body: Vec<u8>) -> Self {
        let id = query
            .get("id")
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        Self {
            method,
            id,
            query,
            body,
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn method_parsing_is_case_insensitive() {
        assert_eq!(Method::parse("get"), Method::Get);
        assert_eq!(Method::parse("DELETE"), Method::Delete);
        assert_eq!(Method::parse("patch"), Method::Other("PATCH".into()));
        assert!(Method::Put.is_write());
        assert!(!Method::Get.is_write());
    }

    #[test]
    fn id_is_lifted_from_query() {
        let ctx = RequestContext::new(Method::Get, query(&[("endpoint", "tickets"), ("id", "42")]), vec![]);
        assert_eq!(ctx.id.as_deref(), Some("42"));
        assert_eq!(ctx.param("endpoint"), Some("tickets"));
    }

    #[test]
    fn blank_id_is_absent() {
        let ctx = RequestContext::new(Method::Put, query(&[("id", "  ")]), vec![]);
        assert_eq!(ctx.id, None);
    }
}
