mod common;

use common::{PASSWORD, register_and_login, spawn_identity, token_for};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

#[tokio::test]
async fn register_validates_and_rejects_duplicates() {
    let identity = spawn_identity().await;
    let client = Client::new();

    let created = client
        .post(identity.url("/register"))
        .json(&json!({ "email": "ana@x.com", "username": "ana", "password": PASSWORD }))
        .send()
        .await
        .expect("request should complete");
    assert_eq!(created.status(), StatusCode::CREATED);
    let body: Value = created.json().await.expect("body should be JSON");
    assert!(body["user_id"].as_i64().is_some());

    let missing = client
        .post(identity.url("/register"))
        .json(&json!({ "email": "bo@x.com", "username": "" }))
        .send()
        .await
        .expect("request should complete");
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    let body: Value = missing.json().await.expect("body should be JSON");
    assert_eq!(body["error"], "missing or empty fields: username, password");

    let weak = client
        .post(identity.url("/register"))
        .json(&json!({ "email": "bo@x.com", "username": "bo", "password": "alllowercase1" }))
        .send()
        .await
        .expect("request should complete");
    assert_eq!(weak.status(), StatusCode::BAD_REQUEST);

    for duplicate in [
        json!({ "email": "ana@x.com", "username": "other", "password": PASSWORD }),
        json!({ "email": "other@x.com", "username": "ana", "password": PASSWORD }),
    ] {
        let response = client
            .post(identity.url("/register"))
            .json(&duplicate)
            .send()
            .await
            .expect("request should complete");
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let identity = spawn_identity().await;
    let client = Client::new();
    register_and_login(&client, &identity, "ana@x.com").await;

    let by_username = client
        .post(identity.url("/login"))
        .json(&json!({ "username": "ana", "password": PASSWORD }))
        .send()
        .await
        .expect("request should complete");
    assert_eq!(by_username.status(), StatusCode::OK);

    let mut bodies = Vec::new();
    for attempt in [
        json!({ "email": "ana@x.com", "password": "Wr0ng!pass" }),
        json!({ "email": "nobody@x.com", "password": PASSWORD }),
    ] {
        let response = client
            .post(identity.url("/login"))
            .json(&attempt)
            .send()
            .await
            .expect("request should complete");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = response.text().await.expect("body should be text");
        bodies.push(body);
    }
    assert_eq!(bodies[0], bodies[1]);

    let incomplete = client
        .post(identity.url("/login"))
        .json(&json!({ "password": PASSWORD }))
        .send()
        .await
        .expect("request should complete");
    assert_eq!(incomplete.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verify_user_confirms_only_the_owner() {
    let identity = spawn_identity().await;
    let client = Client::new();
    let ana = register_and_login(&client, &identity, "ana@x.com").await;
    register_and_login(&client, &identity, "bo@x.com").await;

    let verify = |token: String, email: Option<&'static str>| {
        let mut request = client.get(identity.url("/verify_user")).bearer_auth(token);
        if let Some(email) = email {
            request = request.query(&[("email", email)]);
        }
        request.send()
    };

    let owner = verify(ana.clone(), Some("ana@x.com"))
        .await
        .expect("request should complete");
    assert_eq!(owner.status(), StatusCode::OK);

    let mismatch = verify(ana.clone(), Some("bo@x.com"))
        .await
        .expect("request should complete");
    assert_eq!(mismatch.status(), StatusCode::UNAUTHORIZED);

    let unknown = verify(ana.clone(), Some("ghost@x.com"))
        .await
        .expect("request should complete");
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);

    let no_email = verify(ana, None).await.expect("request should complete");
    assert_eq!(no_email.status(), StatusCode::BAD_REQUEST);

    let forged = verify("not-a-token".into(), Some("ana@x.com"))
        .await
        .expect("request should complete");
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);

    let anonymous = client
        .get(identity.url("/verify_user"))
        .query(&[("email", "ana@x.com")])
        .send()
        .await
        .expect("request should complete");
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_echoes_the_subject() {
    let identity = spawn_identity().await;
    let client = Client::new();

    let response = client
        .get(identity.url("/protected"))
        .bearer_auth(token_for(42))
        .send()
        .await
        .expect("request should complete");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("body should be JSON");
    assert_eq!(body["user_id"], 42);

    let ready = client
        .get(identity.url("/readyz"))
        .send()
        .await
        .expect("request should complete");
    assert_eq!(ready.status(), StatusCode::OK);
}
