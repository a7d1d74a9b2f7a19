//! Tests for Collection and Database
//!
//! These tests verify:
//! - create / find_one / find_by_id
//! - Merge, transform and upsert updates
//! - Bulk updates and every delete flavour
//! - Concurrent creates and transforms (no lost updates)
//! - Database bookkeeping (names, drop, validation)

use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use flatdoc::record::{document_from_json, Document};
use flatdoc::{
    Collection, Config, CorruptionPolicy, Database, DeleteCount, FlatDocError, Query, Update,
    UpdateOptions,
};
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_db() -> (TempDir, Database) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .sync_writes(false)
        .build();
    let db = Database::open(config).unwrap();
    (temp_dir, db)
}

fn doc(value: Value) -> Document {
    document_from_json(value).unwrap()
}

fn on_disk(collection: &Collection) -> Vec<Value> {
    let text = std::fs::read_to_string(collection.path()).unwrap();
    serde_json::from_str(&text).unwrap()
}

// =============================================================================
// Create / Read Tests
// =============================================================================

#[test]
fn test_create_then_find_by_id() {
    let (_temp, db) = setup_temp_db();
    let users = db.collection("users").unwrap();

    let created = users
        .create(doc(json!({"name": "Abha", "email": "abha@example.com", "role": "user"})))
        .unwrap();
    let id = created.id().unwrap().clone();

    let found = users.find_by_id(&id).unwrap().unwrap();
    assert_eq!(found.document(), created.document());

    for field in ["name", "email", "role"] {
        assert_eq!(found[field], created[field]);
    }
    assert!(found["createdAt"].is_string());
    assert_eq!(found["createdAt"], found["updatedAt"]);
}

#[test]
fn test_create_appends_in_insertion_order() {
    let (_temp, db) = setup_temp_db();
    let orders = db.collection("orders").unwrap();

    for n in 0..3 {
        orders.create(doc(json!({"n": n}))).unwrap();
    }

    let ns: Vec<_> = on_disk(&orders).iter().map(|d| d["n"].clone()).collect();
    assert_eq!(ns, vec![json!(0), json!(1), json!(2)]);
}

#[test]
fn test_create_many_preserves_order() {
    let (_temp, db) = setup_temp_db();
    let coupons = db.collection("coupons").unwrap();

    let created = coupons
        .create_many(vec![
            doc(json!({"code": "A"})),
            doc(json!({"code": "B"})),
            doc(json!({"code": "C"})),
        ])
        .unwrap();

    let codes: Vec<_> = created.iter().map(|r| r["code"].as_str().unwrap()).collect();
    assert_eq!(codes, vec!["A", "B", "C"]);
    assert_eq!(coupons.count(Query::new()).unwrap(), 3);
}

#[test]
fn test_create_keeps_supplied_id_and_rejects_duplicates() {
    let (_temp, db) = setup_temp_db();
    let products = db.collection("products").unwrap();

    let created = products.create(doc(json!({"id": 7, "title": "Legacy"}))).unwrap();
    assert_eq!(created.id(), Some(&json!(7)));
    assert!(created.get("id").is_none());

    match products.create(doc(json!({"_id": "7"}))) {
        Err(FlatDocError::InvalidDocument(_)) => {}
        other => panic!("expected duplicate rejection, got {:?}", other),
    }
    assert_eq!(products.count(Query::new()).unwrap(), 1);
}

#[test]
fn test_find_one_returns_first_in_collection_order() {
    let (_temp, db) = setup_temp_db();
    let support = db.collection("support").unwrap();

    support.create(doc(json!({"status": "Open", "subject": "first"}))).unwrap();
    support.create(doc(json!({"status": "Open", "subject": "second"}))).unwrap();

    let found = support.find_one(Query::new().eq("status", "Open")).unwrap().unwrap();
    assert_eq!(found["subject"], json!("first"));

    assert!(support.find_one(Query::new().eq("status", "Closed")).unwrap().is_none());
}

#[test]
fn test_find_by_id_accepts_numeric_and_string_forms() {
    let (_temp, db) = setup_temp_db();
    let products = db.collection("products").unwrap();

    products.create(doc(json!({"_id": 1001, "title": "Numbered"}))).unwrap();

    assert!(products.find_by_id(&json!("1001")).unwrap().is_some());
    assert!(products.find_by_id(&json!(1001)).unwrap().is_some());
    assert!(products.find_by_id(&Value::Null).unwrap().is_none());
}

#[test]
fn test_id_lookup_and_id_query_agree() {
    let (_temp, db) = setup_temp_db();
    let products = db.collection("products").unwrap();

    products.create(doc(json!({"_id": 42, "title": "Answer"}))).unwrap();

    assert!(products.find_by_id(&json!(42.0)).unwrap().is_some());
    assert!(products
        .find_one(Query::new().eq("_id", 42.0))
        .unwrap()
        .is_some());

    // 42.0 names the same record as 42
    assert!(matches!(
        products.create(doc(json!({"_id": 42.0}))),
        Err(FlatDocError::InvalidDocument(_))
    ));
}

#[test]
fn test_large_integer_ids_stay_distinct() {
    let (_temp, db) = setup_temp_db();
    let orders = db.collection("orders").unwrap();

    // 2^53 + 1 has no exact f64 form
    orders
        .create(doc(json!({"_id": 9007199254740993u64, "status": "Pending"})))
        .unwrap();

    let neighbour = json!("9007199254740992");
    assert!(orders.find_by_id(&neighbour).unwrap().is_none());
    assert!(orders
        .find_one(Query::new().eq("_id", neighbour.clone()))
        .unwrap()
        .is_none());

    let updated = orders
        .update_one(
            Query::new().eq("_id", neighbour),
            Update::merge(doc(json!({"status": "Shipped"}))),
            UpdateOptions::default(),
        )
        .unwrap();
    assert!(updated.is_none());

    let stored = orders
        .find_by_id(&json!("9007199254740993"))
        .unwrap()
        .unwrap();
    assert_eq!(stored["status"], json!("Pending"));

    // The neighbouring id is free
    orders
        .create(doc(json!({"_id": 9007199254740992u64})))
        .unwrap();
    assert_eq!(orders.count(Query::new()).unwrap(), 2);
}

#[test]
fn test_stored_alt_id_field_is_queryable() {
    let (_temp, db) = setup_temp_db();
    let users = db.collection("users").unwrap();

    users
        .create(doc(json!({"_id": "u1", "id": "legacy-7", "name": "Both"})))
        .unwrap();
    users.create(doc(json!({"id": "u2", "name": "Renamed"}))).unwrap();

    let both = users.find_one(Query::new().eq("id", "legacy-7")).unwrap().unwrap();
    assert_eq!(both["name"], json!("Both"));

    let renamed = users.find_one(Query::new().eq("id", "u2")).unwrap().unwrap();
    assert_eq!(renamed["name"], json!("Renamed"));
    assert!(users.find_one(Query::new().eq("_id", "legacy-7")).unwrap().is_none());
}

// =============================================================================
// Update Tests
// =============================================================================

#[test]
fn test_update_by_id_merge_restamps() {
    let (_temp, db) = setup_temp_db();
    let orders = db.collection("orders").unwrap();

    let created = orders
        .create(doc(json!({"status": "Pending", "totalAmount": 499})))
        .unwrap();
    let id = created.id().unwrap().clone();

    thread::sleep(Duration::from_millis(5));
    let updated = orders
        .update_by_id(&id, Update::merge(doc(json!({"status": "Shipped", "_id": "hijack"}))))
        .unwrap()
        .unwrap();

    assert_eq!(updated["status"], json!("Shipped"));
    assert_eq!(updated["totalAmount"], json!(499));
    assert_eq!(updated.id(), Some(&id));
    assert_eq!(updated["createdAt"], created["createdAt"]);
    assert_ne!(updated["updatedAt"], created["updatedAt"]);
}

#[test]
fn test_update_by_id_transform_sees_whole_record() {
    let (_temp, db) = setup_temp_db();
    let library = db.collection("digital_library").unwrap();

    let created = library
        .create(doc(json!({"userId": "u1", "items": [{"productId": "p1"}]})))
        .unwrap();
    let id = created.id().unwrap().clone();

    let append_if_absent = |product: &'static str| {
        Update::transform(move |mut record| {
            let items = record
                .get_mut("items")
                .and_then(Value::as_array_mut)
                .unwrap();
            if !items.iter().any(|item| item["productId"] == json!(product)) {
                items.push(json!({"productId": product}));
            }
            record
        })
    };

    library.update_by_id(&id, append_if_absent("p2")).unwrap();
    let updated = library.update_by_id(&id, append_if_absent("p1")).unwrap().unwrap();

    assert_eq!(
        updated["items"],
        json!([{"productId": "p1"}, {"productId": "p2"}])
    );
}

#[test]
fn test_transform_cannot_change_identifier() {
    let (_temp, db) = setup_temp_db();
    let users = db.collection("users").unwrap();

    let id = users.create(doc(json!({"name": "A"}))).unwrap().id().unwrap().clone();

    let updated = users
        .update_by_id(
            &id,
            Update::transform(|mut record| {
                record.remove("_id");
                record.insert("name".to_string(), json!("B"));
                record
            }),
        )
        .unwrap()
        .unwrap();

    assert_eq!(updated.id(), Some(&id));
    assert_eq!(updated.keys().next().map(String::as_str), Some("_id"));
}

#[test]
fn test_update_missing_record_returns_none() {
    let (_temp, db) = setup_temp_db();
    let users = db.collection("users").unwrap();

    let result = users
        .update_by_id(&json!("nope"), Update::merge(doc(json!({"a": 1}))))
        .unwrap();

    assert!(result.is_none());
    assert!(on_disk(&users).is_empty());
}

#[test]
fn test_failed_transform_persists_nothing() {
    let (_temp, db) = setup_temp_db();
    let users = db.collection("users").unwrap();

    let id = users.create(doc(json!({"n": 1}))).unwrap().id().unwrap().clone();

    let result = users.update_by_id(
        &id,
        Update::transform(|_| panic!("transform failed midway")),
    );
    assert!(matches!(result, Err(FlatDocError::OperationPanicked(_))));

    let stored = users.find_by_id(&id).unwrap().unwrap();
    assert_eq!(stored["n"], json!(1));
}

#[test]
fn test_update_one_matches_first() {
    let (_temp, db) = setup_temp_db();
    let shipments = db.collection("shipments").unwrap();

    shipments.create(doc(json!({"orderId": "o1", "awb": ""}))).unwrap();
    shipments.create(doc(json!({"orderId": "o1", "awb": ""}))).unwrap();

    let updated = shipments
        .update_one(
            Query::new().eq("orderId", "o1"),
            Update::merge(doc(json!({"awb": "AWB123"}))),
            UpdateOptions::default(),
        )
        .unwrap()
        .unwrap();

    assert_eq!(updated["awb"], json!("AWB123"));
    let awbs: Vec<_> = on_disk(&shipments).iter().map(|d| d["awb"].clone()).collect();
    assert_eq!(awbs, vec![json!("AWB123"), json!("")]);
}

#[test]
fn test_update_one_upsert_creates_from_query_and_update() {
    let (_temp, db) = setup_temp_db();
    let progress = db.collection("progress").unwrap();

    let query = Query::from_json(&json!({"userId": "u1", "productId": "p9"})).unwrap();

    let created = progress
        .update_one(
            query.clone(),
            Update::merge(doc(json!({"progress": 10}))),
            UpdateOptions::upsert(),
        )
        .unwrap()
        .unwrap();
    assert_eq!(created["userId"], json!("u1"));
    assert_eq!(created["productId"], json!("p9"));
    assert_eq!(created["progress"], json!(10));
    assert!(created.id().is_some());

    // Second call updates instead of inserting
    progress
        .update_one(query, Update::merge(doc(json!({"progress": 55}))), UpdateOptions::upsert())
        .unwrap();

    let all = on_disk(&progress);
    assert_eq!(all.len(), 1);
    assert_eq!(all[0]["progress"], json!(55));
}

#[test]
fn test_update_one_upsert_with_transform() {
    let (_temp, db) = setup_temp_db();
    let library = db.collection("digital_library").unwrap();

    let created = library
        .update_one(
            Query::new().eq("userId", "u2"),
            Update::transform(|mut seed| {
                seed.insert("items".to_string(), json!(["p1"]));
                seed
            }),
            UpdateOptions::upsert(),
        )
        .unwrap()
        .unwrap();

    assert_eq!(created["userId"], json!("u2"));
    assert_eq!(created["items"], json!(["p1"]));
}

#[test]
fn test_update_one_without_upsert_misses() {
    let (_temp, db) = setup_temp_db();
    let carts = db.collection("cart").unwrap();

    let result = carts
        .update_one(
            Query::new().eq("userId", "ghost"),
            Update::merge(doc(json!({"items": []}))),
            UpdateOptions::default(),
        )
        .unwrap();

    assert!(result.is_none());
    assert_eq!(carts.count(Query::new()).unwrap(), 0);
}

#[test]
fn test_update_many_counts_modified() {
    let (_temp, db) = setup_temp_db();
    let users = db.collection("users").unwrap();

    users
        .create_many(vec![
            doc(json!({"role": "user", "notify": false})),
            doc(json!({"role": "admin", "notify": false})),
            doc(json!({"role": "user", "notify": false})),
        ])
        .unwrap();

    let modified = users
        .update_many(
            Query::new().eq("role", "user"),
            doc(json!({"$set": {"notify": true}})),
        )
        .unwrap();
    assert_eq!(modified, 2);

    assert_eq!(users.count(Query::new().eq("notify", true)).unwrap(), 2);
    assert_eq!(
        users
            .update_many(Query::new().eq("role", "guest"), doc(json!({"notify": true})))
            .unwrap(),
        0
    );
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_by_id_then_find_returns_none() {
    let (_temp, db) = setup_temp_db();
    let orders = db.collection("orders").unwrap();

    let id = orders.create(doc(json!({"orderId": "A1"}))).unwrap().id().unwrap().clone();

    let removed = orders.delete_by_id(&id).unwrap().unwrap();
    assert_eq!(removed["orderId"], json!("A1"));

    assert!(orders.find_by_id(&id).unwrap().is_none());
    assert!(orders.delete_by_id(&id).unwrap().is_none());
}

#[test]
fn test_delete_one_removes_first_match() {
    let (_temp, db) = setup_temp_db();
    let support = db.collection("support").unwrap();

    support.create(doc(json!({"userId": "u1", "n": 1}))).unwrap();
    support.create(doc(json!({"userId": "u1", "n": 2}))).unwrap();

    let removed = support.delete_one(Query::new().eq("userId", "u1")).unwrap().unwrap();
    assert_eq!(removed["n"], json!(1));
    assert_eq!(support.count(Query::new()).unwrap(), 1);
    assert!(support.delete_one(Query::new().eq("userId", "u9")).unwrap().is_none());
}

#[test]
fn test_delete_many_empty_query_reports_all() {
    let (_temp, db) = setup_temp_db();
    let payments = db.collection("payments").unwrap();

    for n in 0..5 {
        payments.create(doc(json!({"n": n}))).unwrap();
    }

    let result = payments.delete_many(Query::new()).unwrap();

    assert_eq!(result, DeleteCount::All);
    assert_eq!(result.removed(), None);
    assert!(on_disk(&payments).is_empty());
}

#[test]
fn test_delete_many_with_query_reports_count() {
    let (_temp, db) = setup_temp_db();
    let payments = db.collection("payments").unwrap();

    for status in ["Paid", "Failed", "Paid"] {
        payments.create(doc(json!({"status": status}))).unwrap();
    }

    assert_eq!(
        payments.delete_many(Query::new().eq("status", "Paid")).unwrap(),
        DeleteCount::Removed(2)
    );
    assert_eq!(
        payments.delete_many(Query::new().eq("status", "Refunded")).unwrap(),
        DeleteCount::Removed(0)
    );
    assert_eq!(payments.count(Query::new()).unwrap(), 1);
}

#[test]
fn test_clear_refuses_corrupt_file_under_fail_policy() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .sync_writes(false)
        .corruption_policy(CorruptionPolicy::Fail)
        .build();
    let db = Database::open(config).unwrap();
    let payments = db.collection("payments").unwrap();

    let garbage = "[{\"_id\": \"p1\", \"amount\": 10";
    std::fs::write(payments.path(), garbage).unwrap();

    assert!(matches!(
        payments.delete_many(Query::new()),
        Err(FlatDocError::Corruption { .. })
    ));
    assert_eq!(std::fs::read_to_string(payments.path()).unwrap(), garbage);
}

#[test]
fn test_clear_replaces_corrupt_file_by_default() {
    let (_temp, db) = setup_temp_db();
    let payments = db.collection("payments").unwrap();

    std::fs::write(payments.path(), "not json").unwrap();

    assert_eq!(payments.delete_many(Query::new()).unwrap(), DeleteCount::All);
    assert!(on_disk(&payments).is_empty());
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_creates_are_unique_and_complete() {
    let (_temp, db) = setup_temp_db();
    let orders = db.collection("orders").unwrap();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let orders = orders.clone();
            thread::spawn(move || {
                (0..25)
                    .map(|i| {
                        let record = orders.create(doc(json!({"t": t, "i": i}))).unwrap();
                        record.id().unwrap().as_str().unwrap().to_string()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let ids: Vec<String> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    let unique: HashSet<_> = ids.iter().collect();

    assert_eq!(ids.len(), 200);
    assert_eq!(unique.len(), 200);

    let stored = on_disk(&orders);
    assert_eq!(stored.len(), 200);
    let stored_ids: HashSet<_> = stored.iter().map(|d| d["_id"].as_str().unwrap().to_string()).collect();
    assert_eq!(stored_ids.len(), 200);
}

#[test]
fn test_concurrent_transforms_lose_no_updates() {
    let (_temp, db) = setup_temp_db();
    let coupons = db.collection("coupons").unwrap();

    let id = coupons
        .create(doc(json!({"code": "SAVE10", "usedCount": 0, "usedBy": []})))
        .unwrap()
        .id()
        .unwrap()
        .clone();

    let handles: Vec<_> = (0..20)
        .map(|t| {
            let coupons = coupons.clone();
            let id = id.clone();
            thread::spawn(move || {
                coupons
                    .update_by_id(
                        &id,
                        Update::transform(move |mut record| {
                            let used = record["usedCount"].as_i64().unwrap();
                            record.insert("usedCount".to_string(), json!(used + 1));
                            record["usedBy"].as_array_mut().unwrap().push(json!(t));
                            record
                        }),
                    )
                    .unwrap()
                    .unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let stored = coupons.find_by_id(&id).unwrap().unwrap();
    assert_eq!(stored["usedCount"], json!(20));

    let mut users: Vec<_> = stored["usedBy"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect();
    users.sort();
    assert_eq!(users, (0..20).collect::<Vec<_>>());
}

#[test]
fn test_collections_are_independent() {
    let (_temp, db) = setup_temp_db();
    let users = db.collection("users").unwrap();
    let orders = db.collection("orders").unwrap();

    users.create(doc(json!({"n": 1}))).unwrap();
    orders.create(doc(json!({"n": 2}))).unwrap();
    orders.delete_many(Query::new()).unwrap();

    assert_eq!(users.count(Query::new()).unwrap(), 1);
    assert_eq!(orders.count(Query::new()).unwrap(), 0);
    assert_eq!(db.lane_count(), 2);
}

// =============================================================================
// Database Tests
// =============================================================================

#[test]
fn test_collection_handles_are_shared() {
    let (_temp, db) = setup_temp_db();

    let a = db.collection("users").unwrap();
    let b = db.collection("users").unwrap();
    a.create(doc(json!({"x": 1}))).unwrap();

    assert_eq!(b.count(Query::new()).unwrap(), 1);
}

#[test]
fn test_collection_names_and_drop() {
    let (_temp, db) = setup_temp_db();

    db.collection("users").unwrap();
    db.collection("orders").unwrap();
    assert_eq!(db.collection_names().unwrap(), vec!["orders", "users"]);

    assert!(db.drop_collection("orders").unwrap());
    assert_eq!(db.collection_names().unwrap(), vec!["users"]);
}

#[test]
fn test_invalid_collection_name() {
    let (_temp, db) = setup_temp_db();

    assert!(matches!(
        db.collection("../escape"),
        Err(FlatDocError::InvalidCollectionName(_))
    ));
}

#[test]
fn test_reopen_sees_persisted_records() {
    let temp_dir = TempDir::new().unwrap();

    let id = {
        let db = Database::open_path(temp_dir.path()).unwrap();
        let users = db.collection("users").unwrap();
        users.create(doc(json!({"name": "Persisted"}))).unwrap().id().unwrap().clone()
    };

    let db = Database::open_path(temp_dir.path()).unwrap();
    let found = db.collection("users").unwrap().find_by_id(&id).unwrap().unwrap();
    assert_eq!(found["name"], json!("Persisted"));
}
