use crate::db::batches::start_batch;
use crate::db::connection::{init_db, Database};
use crate::domain::{Decimal, Listing};
use chrono::Utc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Returns a fresh database file in the temp dir with the production schema applied.
pub fn make_db(prefix: &str) -> Database {
    let path = std::env::temp_dir().join(format!(
        "{prefix}_{}.sqlite",
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    let db = Database::new(path.to_string_lossy().into_owned());
    init_db(&db).expect("Failed to initialize DB");
    db
}

/// Opens an ingestion batch row so version rows have something to reference.
pub fn new_batch(db: &Database, partition_key: &str) -> i64 {
    db.with_conn(|conn| start_batch(conn, partition_key, None, Utc::now().naive_utc()))
        .expect("Failed to start batch")
}

pub fn offer(id: &str, uf: &str, city: &str, price: i64) -> Listing {
    Listing {
        source_id: id.to_string(),
        uf: uf.to_string(),
        city: city.to_string(),
        neighborhood: "CENTRO".to_string(),
        address: format!("RUA DAS FLORES, {id}"),
        description: "Casa, 2 quartos".to_string(),
        property_type: "Casa".to_string(),
        selling_type: "Licitação Aberta".to_string(),
        asking_price: Decimal::from_int(price).unwrap(),
        evaluation_price: Decimal::from_int(price * 2).unwrap(),
        discount_percent: Decimal::from_int(50).unwrap(),
    }
}
