use super::*;
use serde_json::Number;

fn new_policy(name: &str, role: i64) -> NewPolicy {
    NewPolicy { name: name.to_string(), role_number: Number::from(role) }
}

async fn exercise_policy_store(store: &dyn PolicyStore) {
    assert!(store.find_all().await.unwrap().is_empty());

    let a = store.insert(new_policy("first", 1)).await.unwrap();
    let b = store.insert(new_policy("second", 2)).await.unwrap();
    assert_ne!(a.id, b.id);
    assert!(a.enabled);

    let all = store.find_all().await.unwrap();
    assert_eq!(all.iter().map(|p| p.id.clone()).collect::<Vec<_>>(), vec![a.id.clone(), b.id.clone()]);

    let patch = PolicyPatch { name: Some("renamed".into()), ..Default::default() };
    let updated = store.update_by_id(&a.id, &patch).await.unwrap().unwrap();
    assert_eq!(updated.name, "renamed");
    assert_eq!(updated.role_number, Number::from(1));
    assert_eq!(updated.created_at, a.created_at);
    assert_eq!(store.find_by_id(&a.id).await.unwrap(), Some(updated.clone()));

    let deleted = store.delete_by_id(&a.id).await.unwrap().unwrap();
    assert_eq!(deleted, updated);
    assert!(store.find_by_id(&a.id).await.unwrap().is_none());
    assert!(store.delete_by_id(&a.id).await.unwrap().is_none());
    assert!(store.update_by_id(&a.id, &patch).await.unwrap().is_none());
    assert_eq!(store.find_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn memory_policy_store_crud() {
    let stores = Stores::memory();
    exercise_policy_store(stores.policies.as_ref()).await;
}

#[tokio::test]
async fn document_policy_store_crud() {
    let tmp = tempfile::tempdir().unwrap();
    let stores = Stores::open_documents(tmp.path(), "testdb").unwrap();
    exercise_policy_store(stores.policies.as_ref()).await;
}

#[tokio::test]
async fn document_store_survives_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let created = {
        let stores = Stores::open_documents(tmp.path(), "testdb").unwrap();
        stores.users.insert(UserRecord { email: "a@b.com".into(), password: "$argon2id$x".into() }).await.unwrap();
        stores.policies.insert(new_policy("kept", 3)).await.unwrap()
    };
    let reopened = Stores::open_documents(tmp.path(), "testdb").unwrap();
    assert_eq!(reopened.policies.find_by_id(&created.id).await.unwrap(), Some(created));
    let user = reopened.users.find_by_email("a@b.com").await.unwrap().unwrap();
    assert_eq!(user.password, "$argon2id$x");
    assert!(tmp.path().join("testdb").join(POLICIES_COLLECTION).is_dir());
}

#[tokio::test]
async fn document_store_skips_corrupt_documents() {
    let tmp = tempfile::tempdir().unwrap();
    let stores = Stores::open_documents(tmp.path(), "testdb").unwrap();
    stores.policies.insert(new_policy("good", 1)).await.unwrap();
    std::fs::write(tmp.path().join("testdb").join(POLICIES_COLLECTION).join("broken.json"), "{not json").unwrap();
    assert_eq!(stores.policies.find_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn document_store_treats_unsafe_ids_as_missing() {
    let tmp = tempfile::tempdir().unwrap();
    let stores = Stores::open_documents(tmp.path(), "testdb").unwrap();
    assert!(stores.policies.find_by_id("../users/x").await.unwrap().is_none());
    assert!(stores.policies.delete_by_id("..").await.unwrap().is_none());
}

#[tokio::test]
async fn user_lookup_is_exact_match() {
    let stores = Stores::memory();
    stores.users.insert(UserRecord { email: "test@example.com".into(), password: "h".into() }).await.unwrap();
    assert!(stores.users.find_by_email("test@example.com").await.unwrap().is_some());
    assert!(stores.users.find_by_email("TEST@example.com").await.unwrap().is_none());
    assert!(stores.users.find_by_email("other@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn document_user_store_handles_long_emails() {
    let tmp = tempfile::tempdir().unwrap();
    let stores = Stores::open_documents(tmp.path(), "testdb").unwrap();
    let long = format!("{}@example.com", "a".repeat(188));
    assert_eq!(long.len(), 200);
    assert!(stores.users.find_by_email(&long).await.unwrap().is_none());
    stores.users.insert(UserRecord { email: long.clone(), password: "h".into() }).await.unwrap();
    assert_eq!(stores.users.find_by_email(&long).await.unwrap().map(|u| u.email), Some(long));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn document_store_concurrent_inserts_all_land() {
    let tmp = tempfile::tempdir().unwrap();
    let stores = Stores::open_documents(tmp.path(), "testdb").unwrap();
    let mut tasks = Vec::new();
    for i in 0..16 {
        let policies = stores.policies.clone();
        tasks.push(tokio::spawn(async move { policies.insert(new_policy(&format!("p{}", i), i)).await }));
    }
    for t in tasks {
        t.await.unwrap().unwrap();
    }
    let all = stores.policies.find_all().await.unwrap();
    assert_eq!(all.len(), 16);
    assert!(all.windows(2).all(|w| w[0].created_at < w[1].created_at));
}

#[tokio::test]
async fn document_store_lists_only_record_files() {
    let tmp = tempfile::tempdir().unwrap();
    let stores = Stores::open_documents(tmp.path(), "testdb").unwrap();
    let kept = stores.policies.insert(new_policy("kept", 1)).await.unwrap();
    let dir = tmp.path().join("testdb").join(POLICIES_COLLECTION);
    std::fs::create_dir(dir.join("nested.json")).unwrap();
    std::fs::write(dir.join(".half.json.tmp"), "{").unwrap();
    std::fs::write(dir.join("notes.txt"), "x").unwrap();
    assert_eq!(stores.policies.find_all().await.unwrap(), vec![kept]);
}
