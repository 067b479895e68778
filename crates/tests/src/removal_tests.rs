use bson::doc;
use convo_db::DocumentStore;
use serde_json::{Value, json};

use crate::fixtures::test_app::TestApp;

#[tokio::test]
async fn removing_one_of_two_members_keeps_the_conversation() {
    let app = TestApp::spawn_without_triggers().await;
    let c1 = app.seed_conversation("c1", &["u1", "u2"], 3).await;

    let (status, body) = app
        .remove_member(json!({ "conversationId": "c1" }), Some("u1"))
        .await;

    assert_eq!(status, 200);
    assert_eq!(body, json!({ "result": { "success": true } }));
    assert_eq!(app.members(&c1).await, Some(vec!["u2".to_string()]));
    assert_eq!(app.subtree_size(&c1), 4);
}

#[tokio::test]
async fn removing_a_non_member_is_a_no_op() {
    let app = TestApp::spawn_without_triggers().await;
    let c1 = app.seed_conversation("c1", &["u1", "u2"], 0).await;

    let (status, _) = app
        .remove_member(json!({ "conversationId": "c1" }), Some("stranger"))
        .await;

    assert_eq!(status, 200);
    assert_eq!(
        app.members(&c1).await,
        Some(vec!["u1".to_string(), "u2".to_string()])
    );
}

#[tokio::test]
async fn each_removal_shrinks_the_member_set_by_one() {
    let app = TestApp::spawn_without_triggers().await;
    let members = ["u1", "u2", "u3", "u4"];
    let c1 = app.seed_conversation("c1", &members, 1).await;

    for (i, uid) in members.iter().take(3).enumerate() {
        let (status, _) = app
            .remove_member(json!({ "conversationId": "c1" }), Some(*uid))
            .await;
        assert_eq!(status, 200);
        assert_eq!(app.members(&c1).await.unwrap().len(), members.len() - i - 1);
    }
}

#[tokio::test]
async fn removing_the_last_member_deletes_everything_beneath() {
    let app = TestApp::spawn_without_triggers().await;
    let c2 = app.seed_conversation("c2", &["u1"], 20).await;
    let neighbour = app.seed_conversation("c20", &["u1"], 2).await;

    let (status, body) = app
        .remove_member(json!({ "conversationId": "c2" }), Some("u1"))
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["result"]["success"], true);
    assert_eq!(app.subtree_size(&c2), 0);
    assert_eq!(app.subtree_size(&neighbour), 3);
}

#[tokio::test]
async fn last_member_cascade_crosses_page_boundaries() {
    let app = TestApp::spawn_without_triggers().await;
    let c2 = app.seed_conversation("c2", &["u1"], 501).await;

    let (status, _) = app
        .remove_member(json!({ "conversationId": "c2" }), Some("u1"))
        .await;

    assert_eq!(status, 200);
    assert_eq!(app.subtree_size(&c2), 0);
}

#[tokio::test]
async fn last_member_cascade_reaches_data_under_deleted_messages() {
    let app = TestApp::spawn_without_triggers().await;
    let c2 = app.seed_conversation("c2", &["u1"], 2).await;

    let m0 = c2.collection("messages").unwrap().doc("m0000").unwrap();
    let reaction = m0.collection("reactions").unwrap().doc("r1").unwrap();
    app.store.set(&reaction, doc! { "emoji": "+1" }).await.unwrap();
    app.store.delete(&m0).await.unwrap();

    let (status, _) = app
        .remove_member(json!({ "conversationId": "c2" }), Some("u1"))
        .await;

    assert_eq!(status, 200);
    assert_eq!(app.subtree_size(&c2), 0);
}

#[tokio::test]
async fn missing_conversation_id_is_invalid_argument() {
    let app = TestApp::spawn_without_triggers().await;

    for data in [json!({}), json!({ "conversationId": "" }), Value::Null] {
        let (status, body) = app.remove_member(data, Some("u1")).await;
        assert_eq!(status, 400);
        assert_eq!(body["error"]["status"], "INVALID_ARGUMENT");
        assert_eq!(
            body["error"]["message"],
            "conversationId and authenticated user are required."
        );
    }
}

#[tokio::test]
async fn anonymous_caller_is_invalid_argument() {
    let app = TestApp::spawn_without_triggers().await;
    let c1 = app.seed_conversation("c1", &["u1"], 0).await;

    let (status, body) = app
        .remove_member(json!({ "conversationId": "c1" }), None)
        .await;

    assert_eq!(status, 400);
    assert_eq!(body["error"]["status"], "INVALID_ARGUMENT");
    assert_eq!(app.members(&c1).await, Some(vec!["u1".to_string()]));
}

#[tokio::test]
async fn unknown_conversation_is_not_found() {
    let app = TestApp::spawn_without_triggers().await;

    let (status, body) = app
        .remove_member(json!({ "conversationId": "does-not-exist" }), Some("u1"))
        .await;

    assert_eq!(status, 404);
    assert_eq!(body["error"]["status"], "NOT_FOUND");
    assert_eq!(body["error"]["message"], "Conversation not found.");
}

#[tokio::test]
async fn removal_and_trigger_together_leave_nothing_behind() {
    let app = TestApp::spawn().await;
    let c2 = app.seed_conversation("c2", &["u1"], 50).await;

    let (status, _) = app
        .remove_member(json!({ "conversationId": "c2" }), Some("u1"))
        .await;

    assert_eq!(status, 200);
    assert!(app.wait_until_gone(&c2).await);
}
