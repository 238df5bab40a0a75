use super::{get, json_body};
use crate::db::offers::SqliteOfferRepository;
use crate::ingest::reconcile::reconcile;
use crate::tests::utils::{make_db, new_batch, offer};

#[test]
fn batches_lists_recent_runs() {
    let db = make_db("router_batches");
    let mut repo = SqliteOfferRepository::new(&db);
    reconcile(&mut repo, "SP", vec![offer("1", "SP", "A", 1)], new_batch(&db, "SP")).unwrap();

    let resp = get(&db, "/batches");
    assert_eq!(resp.status(), 200);

    let body = json_body(resp);
    let batches = body.as_array().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0]["partitionKey"], "SP");
}

#[test]
fn unknown_route_is_json_404() {
    let db = make_db("router_404");
    let resp = get(&db, "/nope");
    assert_eq!(resp.status(), 404);
    assert_eq!(json_body(resp)["error"], "Not Found");
}
