mod batches_tests;
mod offers_tests;

use crate::config::AppConfig;
use crate::db::connection::Database;
use crate::router::handle;
use astra::{Body, Response};
use http::{Method, Request};
use std::io::Read;

/// Runs a GET through the router, rendering errors the way the server does.
pub fn get(db: &Database, uri: &str) -> Response {
    let req = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    match handle(req, db, &AppConfig::default()) {
        Ok(resp) => resp,
        Err(err) => crate::responses::error_to_response(err),
    }
}

pub fn json_body(resp: Response) -> serde_json::Value {
    let mut body = String::new();
    resp.into_body().reader().read_to_string(&mut body).unwrap();
    serde_json::from_str(&body).unwrap()
}
