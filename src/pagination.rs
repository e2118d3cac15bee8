//! Pagination: request normalization, paginated execution, and the labeled
//! response envelope.
//!
//! Each list endpoint accepts `page`/`limit` query parameters, runs its
//! assembled pipeline through [`paginate`], and serializes the result with a
//! per-resource set of envelope labels (`videos`/`totalVideos`,
//! `comments`/`totalComments`, ...).

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::constants::DEFAULT_PAGE_SIZE;
use crate::query::Pipeline;

/// Raw `page`/`limit` query parameters. Kept as strings so non-numeric input
/// falls back to defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageParams {
    /// Normalize into a canonical request: page >= 1 (default 1), limit >= 1
    /// (default 10). No upper bound is applied to `limit`; see the test
    /// below.
    pub fn normalize(&self) -> PageRequest {
        let page = self
            .page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .map(|p| p.max(1))
            .unwrap_or(1);
        let limit = self
            .limit
            .as_deref()
            .and_then(|l| l.trim().parse::<i64>().ok())
            .map(|l| l.max(1))
            .unwrap_or(DEFAULT_PAGE_SIZE);
        PageRequest { page, limit }
    }
}

/// A normalized pagination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

/// Envelope field names for the item list and total count. The remaining
/// envelope keys are fixed.
#[derive(Debug, Clone, Copy)]
pub struct PageLabels {
    pub docs: &'static str,
    pub total_docs: &'static str,
}

impl Default for PageLabels {
    fn default() -> Self {
        Self {
            docs: "docs",
            total_docs: "totalDocs",
        }
    }
}

/// One page of results plus the totals needed for the envelope.
#[derive(Debug)]
pub struct Page<T> {
    pub docs: Vec<T>,
    pub total_docs: i64,
    pub request: PageRequest,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> i64 {
        (self.total_docs + self.request.limit - 1) / self.request.limit
    }

    /// Convert the item type, keeping the pagination bookkeeping.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            docs: self.docs.into_iter().map(f).collect(),
            total_docs: self.total_docs,
            request: self.request,
        }
    }
}

impl<T: Serialize> Page<T> {
    /// Build the response envelope with the given labels.
    pub fn into_envelope(self, labels: PageLabels) -> Value {
        let total_pages = self.total_pages();
        let page = self.request.page;
        let has_prev_page = page > 1;
        let has_next_page = page < total_pages;

        let mut envelope = serde_json::Map::new();
        envelope.insert(labels.docs.to_string(), json!(self.docs));
        envelope.insert(labels.total_docs.to_string(), json!(self.total_docs));
        envelope.insert("limit".into(), json!(self.request.limit));
        envelope.insert("page".into(), json!(page));
        envelope.insert("totalPages".into(), json!(total_pages));
        envelope.insert(
            "serialNumberStartFrom".into(),
            json!((page - 1) * self.request.limit + 1),
        );
        envelope.insert("hasPrevPage".into(), json!(has_prev_page));
        envelope.insert("hasNextPage".into(), json!(has_next_page));
        envelope.insert("prevPage".into(), json!(has_prev_page.then(|| page - 1)));
        envelope.insert("nextPage".into(), json!(has_next_page.then(|| page + 1)));
        Value::Object(envelope)
    }
}

/// Execute a pipeline with pagination: one COUNT query over the filtered set
/// and one page query with LIMIT/OFFSET appended. Store failures propagate;
/// there is no retry here.
pub async fn paginate<T>(
    db: &PgPool,
    pipeline: &Pipeline,
    request: PageRequest,
) -> Result<Page<T>, sqlx::Error>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let mut count_query = QueryBuilder::<Postgres>::new("");
    pipeline.push_count_sql(&mut count_query);
    let (total_docs,): (i64,) = count_query.build_query_as().fetch_one(db).await?;

    let mut page_query = QueryBuilder::<Postgres>::new("");
    pipeline.push_page_sql(&mut page_query);
    page_query.push(" LIMIT ");
    page_query.push_bind(request.limit);
    page_query.push(" OFFSET ");
    page_query.push_bind(request.offset());
    let docs = page_query.build_query_as::<T>().fetch_all(db).await?;

    Ok(Page {
        docs,
        total_docs,
        request,
    })
}

/// Execute a pipeline expecting at most one row (profile views).
pub async fn fetch_optional<T>(db: &PgPool, pipeline: &Pipeline) -> Result<Option<T>, sqlx::Error>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let mut query = QueryBuilder::<Postgres>::new("");
    pipeline.push_page_sql(&mut query);
    query.build_query_as::<T>().fetch_optional(db).await
}

/// Execute a pipeline without pagination (bounded views such as watch
/// history or playlist contents).
pub async fn fetch_all<T>(db: &PgPool, pipeline: &Pipeline) -> Result<Vec<T>, sqlx::Error>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let mut query = QueryBuilder::<Postgres>::new("");
    pipeline.push_page_sql(&mut query);
    query.build_query_as::<T>().fetch_all(db).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<&str>, limit: Option<&str>) -> PageParams {
        PageParams {
            page: page.map(String::from),
            limit: limit.map(String::from),
        }
    }

    fn page_of(n: usize, total: i64, page: i64, limit: i64) -> Page<i64> {
        Page {
            docs: (0..n as i64).collect(),
            total_docs: total,
            request: PageRequest { page, limit },
        }
    }

    #[test]
    fn test_normalize_defaults() {
        let request = params(None, None).normalize();
        assert_eq!(request, PageRequest { page: 1, limit: 10 });
    }

    #[test]
    fn test_normalize_non_numeric_falls_back() {
        let request = params(Some("abc"), Some("xyz")).normalize();
        assert_eq!(request, PageRequest { page: 1, limit: 10 });
    }

    #[test]
    fn test_normalize_clamps_non_positive() {
        let request = params(Some("0"), Some("-3")).normalize();
        assert_eq!(request, PageRequest { page: 1, limit: 1 });
    }

    #[test]
    fn test_limit_has_no_upper_bound() {
        // Deliberately preserved behavior: a caller may request an
        // arbitrarily large page. Flagged here rather than clamped.
        let request = params(None, Some("1000000")).normalize();
        assert_eq!(request.limit, 1_000_000);
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest { page: 1, limit: 10 }.offset(), 0);
        assert_eq!(PageRequest { page: 3, limit: 25 }.offset(), 50);
    }

    #[test]
    fn test_total_pages_is_ceiling() {
        assert_eq!(page_of(10, 21, 1, 10).total_pages(), 3);
        assert_eq!(page_of(10, 20, 1, 10).total_pages(), 2);
        assert_eq!(page_of(0, 0, 1, 10).total_pages(), 0);
    }

    #[test]
    fn test_envelope_labels_and_math() {
        let envelope = page_of(10, 21, 2, 10).into_envelope(PageLabels {
            docs: "videos",
            total_docs: "totalVideos",
        });
        assert_eq!(envelope["videos"].as_array().unwrap().len(), 10);
        assert_eq!(envelope["totalVideos"], 21);
        assert_eq!(envelope["page"], 2);
        assert_eq!(envelope["totalPages"], 3);
        assert_eq!(envelope["serialNumberStartFrom"], 11);
        assert_eq!(envelope["hasPrevPage"], true);
        assert_eq!(envelope["hasNextPage"], true);
        assert_eq!(envelope["prevPage"], 1);
        assert_eq!(envelope["nextPage"], 3);
        assert!(envelope.get("docs").is_none());
        assert!(envelope.get("totalDocs").is_none());
    }

    #[test]
    fn test_envelope_first_and_last_page() {
        let first = page_of(10, 21, 1, 10).into_envelope(PageLabels::default());
        assert_eq!(first["hasPrevPage"], false);
        assert_eq!(first["prevPage"], Value::Null);

        let last = page_of(1, 21, 3, 10).into_envelope(PageLabels::default());
        assert_eq!(last["hasNextPage"], false);
        assert_eq!(last["nextPage"], Value::Null);
    }

    #[test]
    fn test_envelope_empty_result() {
        let envelope = page_of(0, 0, 1, 10).into_envelope(PageLabels::default());
        assert_eq!(envelope["totalDocs"], 0);
        assert_eq!(envelope["totalPages"], 0);
        assert_eq!(envelope["hasNextPage"], false);
        assert_eq!(envelope["hasPrevPage"], false);
    }

    #[test]
    fn test_map_keeps_bookkeeping() {
        let page = page_of(3, 7, 2, 3).map(|v| v.to_string());
        assert_eq!(page.docs, vec!["0", "1", "2"]);
        assert_eq!(page.total_docs, 7);
        assert_eq!(page.request.page, 2);
    }
}
