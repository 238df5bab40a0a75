use crate::config::{AppConfig, MAX_PAGE_LIMIT};
use crate::db::{get_recent_batches, offer_history, query_current_offers, Database};
use crate::domain::CurrentOffer;
use crate::errors::ServerError;
use crate::filter::{parse_filter, parse_sort};
use crate::responses::{json_response, ResultResp};
use astra::Request;
use percent_encoding::percent_decode_str;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Serialize)]
struct OffersPage {
    items: Vec<CurrentOffer>,
    limit: u32,
    offset: u32,
}

pub fn handle(req: Request, db: &Database, config: &AppConfig) -> ResultResp {
    let method = req.method().as_str();
    let path = req.uri().path();

    match (method, path) {
        ("GET", "/offers") => list_offers(&req, db, config),
        ("GET", "/batches") => {
            let batches = db.with_conn(|conn| get_recent_batches(conn))?;
            json_response(&batches)
        }
        ("GET", _) => match history_source_id(path) {
            Some(source_id) => history(db, &source_id),
            None => Err(ServerError::NotFound),
        },
        _ => Err(ServerError::NotFound),
    }
}

fn list_offers(req: &Request, db: &Database, config: &AppConfig) -> ResultResp {
    let params = parse_query(req);

    let filter = match non_blank(&params, "filter") {
        Some(text) => Some(parse_filter(text)?),
        None => None,
    };
    // Absent sort falls back to newest first.
    let sort = match non_blank(&params, "sort") {
        Some(text) => parse_sort(text)?,
        None => Vec::new(),
    };
    let limit = match non_blank(&params, "limit") {
        Some(text) => match text.trim().parse::<u32>() {
            Ok(n) if (1..=MAX_PAGE_LIMIT).contains(&n) => n,
            _ => {
                return Err(ServerError::BadRequest(format!(
                    "limit must be an integer between 1 and {MAX_PAGE_LIMIT}"
                )))
            }
        },
        None => config.page_limit,
    };
    let offset = match non_blank(&params, "offset") {
        Some(text) => text.trim().parse::<u32>().map_err(|_| {
            ServerError::BadRequest("offset must be a non-negative integer".to_string())
        })?,
        None => 0,
    };

    let items = query_current_offers(db, filter.as_ref(), &sort, limit, offset)?;
    debug!(count = items.len(), limit, offset, "listed offers");

    json_response(&OffersPage {
        items,
        limit,
        offset,
    })
}

fn history(db: &Database, source_id: &str) -> ResultResp {
    let versions = offer_history(db, source_id)?;
    if versions.is_empty() {
        return Err(ServerError::NotFound);
    }
    json_response(&versions)
}

/// Extracts and percent-decodes `{sourceId}` from `/offers/{sourceId}/history`.
fn history_source_id(path: &str) -> Option<Cow<'_, str>> {
    let raw = path
        .strip_prefix("/offers/")?
        .strip_suffix("/history")
        .filter(|id| !id.is_empty() && !id.contains('/'))?;
    percent_decode_str(raw).decode_utf8().ok()
}

fn non_blank<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
}

fn parse_query(req: &Request) -> HashMap<String, String> {
    req.uri()
        .query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}
