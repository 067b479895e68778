use bson::doc;
use convo_db::DocumentStore;
use serde_json::Value;

use crate::fixtures::test_app::TestApp;

#[tokio::test]
async fn direct_write_emptying_members_deletes_the_conversation() {
    let app = TestApp::spawn().await;
    let c3 = app.seed_conversation("c3", &["u1", "u2"], 5).await;

    app.store
        .set(&c3, doc! { "members": [], "title": "c3" })
        .await
        .unwrap();

    assert!(app.wait_until_gone(&c3).await);
}

#[tokio::test]
async fn creating_a_conversation_without_members_is_swept() {
    let app = TestApp::spawn().await;
    let orphan = convo_db::models::Conversation::reference("orphan").unwrap();

    app.store
        .set(&orphan, doc! { "title": "nobody home" })
        .await
        .unwrap();

    assert!(app.wait_until_gone(&orphan).await);
}

#[tokio::test]
async fn populated_conversations_survive_writes() {
    let app = TestApp::spawn().await;
    let c4 = app.seed_conversation("c4", &["u1"], 2).await;

    app.store
        .set(&c4, doc! { "members": ["u1", "u2"], "title": "renamed" })
        .await
        .unwrap();

    let (status, body) = trigger(&app, "c4").await;
    assert_eq!(status, 200);
    assert_eq!(body["deleted"], false);
    assert_eq!(app.subtree_size(&c4), 3);
}

#[tokio::test]
async fn delivered_trigger_sweeps_an_empty_conversation() {
    let app = TestApp::spawn_without_triggers().await;
    let c5 = app.seed_conversation("c5", &[], 4).await;

    let (status, body) = trigger(&app, "c5").await;

    assert_eq!(status, 200);
    assert_eq!(body["deleted"], true);
    assert_eq!(body["documents"], 5);
    assert_eq!(app.subtree_size(&c5), 0);

    // Delivering the same event again finds nothing to do.
    let (status, body) = trigger(&app, "c5").await;
    assert_eq!(status, 200);
    assert_eq!(body["deleted"], false);
}

async fn trigger(app: &TestApp, conversation_id: &str) -> (u16, Value) {
    let resp = app
        .client
        .post(app.url(&format!("/api/trigger/conversations/{conversation_id}")))
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}
