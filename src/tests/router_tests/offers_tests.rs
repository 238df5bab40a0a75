use super::{get, json_body};
use crate::db::offers::SqliteOfferRepository;
use crate::ingest::reconcile::reconcile;
use crate::tests::utils::{make_db, new_batch, offer};

fn encode(text: &str) -> String {
    url::form_urlencoded::byte_serialize(text.as_bytes()).collect()
}

fn seeded_db(prefix: &str) -> crate::db::connection::Database {
    let db = make_db(prefix);
    let mut repo = SqliteOfferRepository::new(&db);
    reconcile(
        &mut repo,
        "SP",
        vec![
            offer("1", "SP", "CAMPINAS", 300_000),
            offer("2", "SP", "SANTOS", 100_000),
            offer("3", "SP", "SOROCABA", 200_000),
        ],
        new_batch(&db, "SP"),
    )
    .unwrap();
    db
}

#[test]
fn offers_applies_filter_and_sort() {
    let db = seeded_db("router_offers");
    let uri = format!(
        "/offers?filter={}&sort={}",
        encode("askingPrice ge 150000 or city eq 'SANTOS'"),
        encode("askingPrice asc")
    );

    let resp = get(&db, &uri);
    assert_eq!(resp.status(), 200);

    let body = json_body(resp);
    let ids: Vec<_> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["sourceId"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, ["2", "3", "1"]);
    assert_eq!(body["limit"], 50);
    assert_eq!(body["offset"], 0);
    assert_eq!(body["items"][0]["askingPrice"], "100000");
    assert_eq!(body["items"][0]["version"], 1);
    assert!(body["items"][0]["createdAt"].is_string());
}

#[test]
fn offers_pages_with_limit_and_offset() {
    let db = seeded_db("router_paging");
    let body = json_body(get(&db, "/offers?sort=city&limit=1&offset=1"));

    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["city"], "SANTOS");
    assert_eq!(body["limit"], 1);
}

#[test]
fn blank_filter_means_no_filter() {
    let db = seeded_db("router_blank");
    let body = json_body(get(&db, "/offers?filter=%20%20"));
    assert_eq!(body["items"].as_array().unwrap().len(), 3);
}

#[test]
fn invalid_filter_is_400_with_offset() {
    let db = seeded_db("router_bad_filter");
    let uri = format!("/offers?filter={}", encode("askingPrice contains '1'"));

    let resp = get(&db, &uri);
    assert_eq!(resp.status(), 400);

    let body = json_body(resp);
    assert!(body["error"].as_str().unwrap().contains("contains"));
    assert_eq!(body["offset"], 12);
}

#[test]
fn invalid_sort_and_paging_are_400() {
    let db = seeded_db("router_bad_params");

    assert_eq!(get(&db, "/offers?sort=price").status(), 400);
    assert_eq!(get(&db, "/offers?limit=0").status(), 400);
    assert_eq!(get(&db, "/offers?limit=501").status(), 400);
    assert_eq!(get(&db, "/offers?offset=-3").status(), 400);
}

#[test]
fn history_lists_every_version() {
    let db = seeded_db("router_history");
    let mut repo = SqliteOfferRepository::new(&db);
    reconcile(
        &mut repo,
        "SP",
        vec![offer("1", "SP", "CAMPINAS", 300_000)],
        new_batch(&db, "SP"),
    )
    .unwrap();

    let resp = get(&db, "/offers/2/history");
    assert_eq!(resp.status(), 200);

    let body = json_body(resp);
    let versions = body.as_array().unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0]["operation"], "insert");
    assert_eq!(versions[1]["operation"], "delete");
    assert_eq!(versions[1]["version"], 2);

    let active = json_body(get(&db, "/offers"));
    assert_eq!(active["items"].as_array().unwrap().len(), 1);
}

#[test]
fn history_of_unknown_offer_is_404() {
    let db = seeded_db("router_history_404");
    assert_eq!(get(&db, "/offers/999/history").status(), 404);
}

#[test]
fn history_decodes_percent_encoded_source_ids() {
    let db = make_db("router_history_encoded");
    let mut repo = SqliteOfferRepository::new(&db);
    reconcile(
        &mut repo,
        "SP",
        vec![offer("ABC 123/7", "SP", "CAMPINAS", 1)],
        new_batch(&db, "SP"),
    )
    .unwrap();

    let resp = get(&db, "/offers/ABC%20123%2F7/history");
    assert_eq!(resp.status(), 200);

    let body = json_body(resp);
    assert_eq!(body[0]["sourceId"], "ABC 123/7");
}
