use serde::Serialize;

pub const DEFAULT_LIMIT: u32 = 50;
pub const MAX_LIMIT: u32 = 100;

/// Page request taken from `page`/`limit` query parameters. `page >= 1` and
/// `limit` in `[1, MAX_LIMIT]` always hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    pub fn from_params(page: Option<&str>, limit: Option<&str>) -> Self {
        let page = page.map(lenient_int).unwrap_or(1).max(1);
        let limit = limit
            .map(lenient_int)
            .unwrap_or(i64::from(DEFAULT_LIMIT))
            .clamp(1, i64::from(MAX_LIMIT));
        Self {
            page: u32::try_from(page).unwrap_or(u32::MAX),
            limit: limit as u32,
        }
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.limit as usize)
    }

    pub fn info(&self, total: u64) -> PageInfo {
        PageInfo {
            page: self.page,
            limit: self.limit,
            total,
            total_pages: total.div_ceil(u64::from(self.limit)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

/// Integer prefix of a query value; anything unparseable reads as 0.
fn lenient_int(raw: &str) -> i64 {
    let raw = raw.trim();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end]
        .parse::<i64>()
        .map(|n| sign * n)
        .unwrap_or(if end > 0 { i64::MAX * sign } else { 0 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_absent() {
        assert_eq!(Pagination::from_params(None, None), Pagination::default());
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(Pagination::from_params(None, Some("500")).limit, 100);
        assert_eq!(Pagination::from_params(None, Some("0")).limit, 1);
        assert_eq!(Pagination::from_params(None, Some("-3")).limit, 1);
        assert_eq!(Pagination::from_params(None, Some("abc")).limit, 1);
        assert_eq!(Pagination::from_params(None, Some("25")).limit, 25);
    }

    #[test]
    fn page_is_at_least_one() {
        assert_eq!(Pagination::from_params(Some("0"), None).page, 1);
        assert_eq!(Pagination::from_params(Some("-9"), None).page, 1);
        assert_eq!(Pagination::from_params(Some("3rd"), None).page, 3);
        assert_eq!(Pagination::from_params(Some("99999999999999999999"), None).page, u32::MAX);
    }

    #[test]
    fn total_pages_rounds_up() {
        let p = Pagination { page: 1, limit: 50 };
        assert_eq!(p.info(0).total_pages, 0);
        assert_eq!(p.info(50).total_pages, 1);
        assert_eq!(p.info(51).total_pages, 2);
        assert_eq!(Pagination { page: 1, limit: 1 }.info(7).total_pages, 7);
    }

    #[test]
    fn page_info_serializes_camel_case() {
        let json = serde_json::to_value(Pagination { page: 2, limit: 10 }.info(35)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "page": 2, "limit": 10, "total": 35, "totalPages": 4 })
        );
    }

    #[test]
    fn offset_skips_previous_pages() {
        assert_eq!(Pagination { page: 3, limit: 10 }.offset(), 20);
    }
}
