mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{TestApp, items};
use garden_types::models::AuthMode;

#[tokio::test]
async fn user_token_is_forbidden_on_admin_routes() {
    let app = TestApp::new(AuthMode::PerUser);
    let token = app.register("luna", "gardenflower").await;

    let (status, _) = app
        .call(Method::GET, "/api/admin/diaries", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(Method::GET, "/api/secret/diaries", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    // And the other way round: an admin session is not a zone session.
    let admin = app.admin_token().await;
    let (status, _) = app
        .call(Method::GET, "/api/secret/diaries", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn only_the_author_edits_or_deletes_a_diary() {
    let app = TestApp::new(AuthMode::PerUser);
    let luna = app.register("luna", "gardenflower").await;
    let sol = app.register("sol", "sunflower").await;
    let id = app.write_diary(&luna, "夜", "安", true).await;
    let path = format!("/api/secret/diaries/{id}");

    let (status, _) = app
        .call(Method::PUT, &path, Some(&sol), Some(json!({ "content": "mine now" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.call(Method::DELETE, &path, Some(&sol), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, theirs) = app
        .call(Method::GET, "/api/secret/diaries", Some(&sol), None)
        .await;
    assert!(items(&theirs).is_empty());

    let (status, _) = app
        .call(Method::PUT, &path, Some(&luna), Some(json!({ "content": "晚安" })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, own) = app
        .call(Method::GET, "/api/secret/diaries", Some(&luna), None)
        .await;
    let diary = &items(&own)[0];
    assert_eq!(diary["content"], "晚安");
    assert_eq!(diary["title"], "夜");
    assert_eq!(diary["is_public"], true);

    let (status, _) = app.call(Method::DELETE, &path, Some(&luna), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.call(Method::DELETE, &path, Some(&luna), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_diary_ids_are_rejected() {
    let app = TestApp::new(AuthMode::PerUser);
    let luna = app.register("luna", "gardenflower").await;
    let (status, _) = app
        .call(Method::DELETE, "/api/secret/diaries/not-a-number", Some(&luna), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn notes_are_visible_to_sender_and_recipient_only() {
    let app = TestApp::new(AuthMode::PerUser);
    let luna = app.register("luna", "gardenflower").await;
    let sol = app.register("sol", "sunflower").await;
    let star = app.register("star", "twinkle-twinkle").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/secret/messages",
            Some(&luna),
            Some(json!({ "to_name": "nobody", "content": "hello?" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, sent) = app
        .call(
            Method::POST,
            "/api/secret/messages",
            Some(&luna),
            Some(json!({ "to_name": "sol", "content": "meet at the bench" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let note_id = sent["id"].as_i64().unwrap();

    for token in [&luna, &sol] {
        let (_, notes) = app
            .call(Method::GET, "/api/secret/messages", Some(token), None)
            .await;
        let notes = items(&notes);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0]["from_name"], "luna");
        assert_eq!(notes[0]["to_name"], "sol");
    }
    let (_, notes) = app
        .call(Method::GET, "/api/secret/messages", Some(&star), None)
        .await;
    assert!(items(&notes).is_empty());

    // The recipient cannot delete it; the sender can.
    let path = format!("/api/secret/messages/{note_id}");
    let (status, _) = app.call(Method::DELETE, &path, Some(&sol), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.call(Method::DELETE, &path, Some(&luna), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn oversized_notes_are_rejected() {
    let app = TestApp::new(AuthMode::PerUser);
    let luna = app.register("luna", "gardenflower").await;
    app.register("sol", "sunflower").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/secret/messages",
            Some(&luna),
            Some(json!({ "to_name": "sol", "content": "字".repeat(301) })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_guestbook_note_is_rejected_before_storage() {
    let app = TestApp::new(AuthMode::PerUser);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/public/messages",
            None,
            Some(json!({ "content": "a".repeat(261) })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, feed) = app.call(Method::GET, "/api/public/messages", None, None).await;
    assert!(items(&feed).is_empty());

    // The rejected post did not consume the cooldown slot.
    let (status, _) = app
        .call(
            Method::POST,
            "/api/public/messages",
            None,
            Some(json!({ "content": "a".repeat(260) })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn guestbook_markup_is_stored_escaped() {
    let app = TestApp::new(AuthMode::PerUser);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/public/messages",
            None,
            Some(json!({ "nickname": "<b>", "content": "<script>alert(1)</script>" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, feed) = app.call(Method::GET, "/api/public/messages", None, None).await;
    let post = &items(&feed)[0];
    assert_eq!(post["content"], "&lt;script&gt;alert(1)&lt;/script&gt;");
    assert_eq!(post["nickname"], "&lt;b&gt;");

    let luna = app.register("luna", "gardenflower").await;
    let (status, _) = app
        .call(
            Method::POST,
            "/api/secret/user-messages",
            Some(&luna),
            Some(json!({ "content": "<i>hi</i>" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, feed) = app
        .call(Method::GET, "/api/public/user-messages", None, None)
        .await;
    let post = &items(&feed)[0];
    assert_eq!(post["username"], "luna");
    assert_eq!(post["content"], "&lt;i&gt;hi&lt;/i&gt;");
}

#[tokio::test]
async fn guestbook_posts_are_cooled_down_per_ip() {
    let app = TestApp::new(AuthMode::PerUser);
    let post = json!({ "content": "hello garden" });

    let (status, _) = app
        .call(Method::POST, "/api/public/messages", None, Some(post.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .call(Method::POST, "/api/public/messages", None, Some(post.clone()))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].is_string());

    let (status, _) = app
        .call_from([10, 0, 0, 9], Method::POST, "/api/public/messages", None, Some(post))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn failed_guestbook_insert_does_not_start_the_cooldown() {
    let app = TestApp::new(AuthMode::PerUser);
    let post = json!({ "content": "hello garden" });

    app.state
        .db
        .with_conn(|c| {
            c.execute_batch("ALTER TABLE messages_public RENAME TO messages_parked")?;
            Ok(())
        })
        .unwrap();
    let (status, _) = app
        .call(Method::POST, "/api/public/messages", None, Some(post.clone()))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    app.state
        .db
        .with_conn(|c| {
            c.execute_batch("ALTER TABLE messages_parked RENAME TO messages_public")?;
            Ok(())
        })
        .unwrap();
    let (status, _) = app
        .call(Method::POST, "/api/public/messages", None, Some(post))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn public_listing_shows_excerpts_of_public_diaries_only() {
    let app = TestApp::new(AuthMode::PerUser);
    let luna = app.register("luna", "gardenflower").await;
    app.write_diary(&luna, "长", &"花".repeat(300), true).await;

    let (status, body) = app.call(Method::GET, "/api/public/diaries", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let diaries = items(&body);
    // Two public samples plus luna's.
    assert_eq!(diaries.len(), 3);
    assert_eq!(diaries[0]["author"], "luna");
    assert_eq!(diaries[0]["excerpt"].as_str().unwrap().chars().count(), 120);
    assert!(diaries.iter().all(|d| d.get("content").is_none()));
}

#[tokio::test]
async fn public_diary_markup_is_escaped() {
    let app = TestApp::new(AuthMode::PerUser);
    let luna = app.register("luna", "gardenflower").await;
    app.write_diary(&luna, "<img src=x onerror=alert(1)>", "<script>steal()</script>", true)
        .await;

    let (_, body) = app.call(Method::GET, "/api/public/diaries", None, None).await;
    let diary = &items(&body)[0];
    assert_eq!(diary["title"], "&lt;img src=x onerror=alert(1)&gt;");
    assert_eq!(diary["excerpt"], "&lt;script&gt;steal()&lt;/script&gt;");

    // The author's own view keeps the text as written.
    let (_, body) = app.call(Method::GET, "/api/secret/diaries", Some(&luna), None).await;
    assert!(items(&body).iter().any(|d| d["title"] == "<img src=x onerror=alert(1)>"));
}

#[tokio::test]
async fn unknown_routes_answer_json_404() {
    let app = TestApp::new(AuthMode::PerUser);
    let (status, body) = app.call(Method::GET, "/api/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}
