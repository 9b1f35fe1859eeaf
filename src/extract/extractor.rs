//! Entity extractor implementation

use super::types::Page;
use crate::auth::TokenManager;
use crate::config::EntityConfig;
use crate::error::{Error, Result};
use crate::http::{ApiClient, RequestConfig};
use crate::schema::EntitySchema;
use crate::state::CursorValue;
use crate::types::{JsonObject, JsonValue};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Paginated extractor for one entity
///
/// Finite and not restartable mid-page. Records within a page preserve
/// source order; cross-page ordering is only guaranteed through monotonic
/// cursor advancement by the caller.
pub struct EntityExtractor<'a> {
    client: &'a ApiClient,
    tokens: &'a mut TokenManager,
    entity: &'a EntityConfig,
    schema: &'a EntitySchema,
    page_size: usize,
    since: Option<CursorValue>,
    offset: u64,
    page_number: u32,
    done: bool,
}

impl<'a> EntityExtractor<'a> {
    /// Create an extractor for one entity
    ///
    /// `since` is the committed cursor from the previous invocation; absent
    /// means initial full extraction.
    pub fn new(
        client: &'a ApiClient,
        tokens: &'a mut TokenManager,
        entity: &'a EntityConfig,
        schema: &'a EntitySchema,
        page_size: usize,
        since: Option<CursorValue>,
    ) -> Self {
        Self {
            client,
            tokens,
            entity,
            schema,
            page_size,
            since,
            offset: 0,
            page_number: 0,
            done: false,
        }
    }

    /// Fetch the next page, or None when extraction is complete
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        if self.done {
            return Ok(None);
        }

        let raw = self.fetch_page().await?;
        let records = self.unwrap_records(raw)?;

        let fetched = records.len();
        self.page_number += 1;

        // A short or empty page is the end-of-data signal
        let has_more = fetched == self.page_size && fetched > 0;
        if !has_more {
            self.done = true;
        }

        debug!(
            entity = %self.entity.name,
            page = self.page_number,
            records = fetched,
            has_more,
            "fetched page"
        );

        if fetched == 0 {
            return Ok(None);
        }

        let conformed: Vec<JsonObject> =
            records.iter().map(|r| self.schema.conform(r)).collect();
        let cursor_candidate = self.cursor_candidate(&conformed);
        self.offset += fetched as u64;

        Ok(Some(Page {
            records: conformed,
            number: self.page_number,
            cursor_candidate,
            has_more,
        }))
    }

    /// Issue the page request, re-authenticating once on a 401
    async fn fetch_page(&mut self) -> Result<JsonValue> {
        match self.request_once().await {
            Err(Error::HttpStatus { status: 401, .. }) => {
                warn!(entity = %self.entity.name, "401 from data API, re-authenticating");
                self.tokens.invalidate();
                match self.request_once().await {
                    Err(Error::HttpStatus { status: 401, body }) => Err(Error::extraction(
                        &self.entity.name,
                        format!("still unauthorized after re-authentication: {body}"),
                    )),
                    other => other,
                }
            }
            other => other,
        }
        .map_err(|e| match e {
            // Auth failures during refresh stay fatal to the invocation
            e if e.is_fatal() => e,
            e @ (Error::Extraction { .. } | Error::PayloadShape { .. }) => e,
            e => Error::extraction(&self.entity.name, e.to_string()),
        })
    }

    async fn request_once(&mut self) -> Result<JsonValue> {
        let token = self.tokens.ensure_valid().await?;
        let bearer = token.access_token.clone();
        let base = token.api_base_url.trim_end_matches('/').to_string();
        let url = format!("{base}{}", self.entity.endpoint);

        let mut config = RequestConfig::new()
            .bearer(bearer)
            .query("limit", self.page_size.to_string())
            .query("offset", self.offset.to_string());

        if let Some(since) = &self.since {
            config = config.query(&self.entity.cursor_param, since.to_query_value());
        }

        self.client.get_json(&url, config).await
    }

    fn unwrap_records(&self, payload: JsonValue) -> Result<Vec<JsonValue>> {
        unwrap_record_array(&self.entity.name, payload)
    }

    /// Pick the cursor this page advances to once committed
    fn cursor_candidate(&self, records: &[JsonObject]) -> Option<CursorValue> {
        let max_timestamp = records
            .iter()
            .filter_map(|r| r.get(&self.entity.cursor_field))
            .filter_map(JsonValue::as_str)
            .filter_map(parse_timestamp)
            .max();

        match max_timestamp {
            Some(ts) => Some(CursorValue::Timestamp(ts)),
            // No usable timestamps: fall back to counting committed records
            None => Some(CursorValue::Offset(self.offset + records.len() as u64)),
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Accept a top-level array or an object wrapping one under `data`
fn unwrap_record_array(entity: &str, payload: JsonValue) -> Result<Vec<JsonValue>> {
    match payload {
        JsonValue::Array(records) => Ok(records),
        JsonValue::Object(mut map) => match map.remove("data") {
            Some(JsonValue::Array(records)) => Ok(records),
            _ => Err(Error::payload_shape(
                entity,
                "expected a JSON array of records",
            )),
        },
        _ => Err(Error::payload_shape(
            entity,
            "expected a JSON array of records",
        )),
    }
}

/// Fetch up to `sample_size` unconformed records for schema inference
///
/// Used by the `schema` operation for entities without a static schema;
/// shares the extractor's auth and payload handling but applies no
/// conformance, since there is no schema yet.
pub async fn fetch_samples(
    client: &ApiClient,
    tokens: &mut TokenManager,
    entity: &EntityConfig,
    sample_size: usize,
) -> Result<Vec<JsonValue>> {
    let request = |bearer: String| {
        RequestConfig::new()
            .bearer(bearer)
            .query("limit", sample_size.to_string())
            .query("offset", "0")
    };

    let token = tokens.ensure_valid().await?;
    let base = token.api_base_url.trim_end_matches('/').to_string();
    let url = format!("{base}{}", entity.endpoint);
    let bearer = token.access_token.clone();

    let payload = match client.get_json(&url, request(bearer)).await {
        Err(Error::HttpStatus { status: 401, .. }) => {
            tokens.invalidate();
            let token = tokens.ensure_valid().await?;
            let base = token.api_base_url.trim_end_matches('/').to_string();
            let url = format!("{base}{}", entity.endpoint);
            let bearer = token.access_token.clone();
            client.get_json(&url, request(bearer)).await
        }
        other => other,
    }
    .map_err(|e| {
        if e.is_fatal() {
            e
        } else {
            Error::schema(&entity.name, format!("sample fetch failed: {e}"))
        }
    })?;

    unwrap_record_array(&entity.name, payload)
        .map_err(|e| Error::schema(&entity.name, e.to_string()))
}
