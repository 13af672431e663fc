#![allow(dead_code)]

use car_rental::{
    db::{self, Schema},
    identity_app, inventory_app,
    services::{
        credential_store::HashingConfig,
        subject_verifier::VerifierConfig,
        token_authority::{TokenAuthority, TokenConfig},
    },
    state::{IdentityState, InventoryState},
};
use reqwest::{Client, Url};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use std::{net::SocketAddr, time::Duration};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const SECRET: &str = "integration-secret";
pub const PASSWORD: &str = "Str0ng!pw";

/// A router served on an ephemeral localhost port, plus the database it owns.
pub struct TestServer {
    pub addr: SocketAddr,
    pub db: SqlitePool,
    _dir: TempDir,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub fn token_config() -> TokenConfig {
    TokenConfig::new(SECRET)
}

pub fn token_for(subject: i64) -> String {
    TokenAuthority::new(&token_config())
        .issue(subject)
        .expect("token should be issued")
        .token
}

async fn scratch_db(schema: Schema) -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = dir.path().join("service.db");
    let url = format!("sqlite://{}", path.display());
    let db = db::connect(&url, 5).await.expect("database should open");
    db::run_migrations(&db, schema)
        .await
        .expect("migrations should apply");
    (dir, db)
}

async fn serve(app: axum::Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("ephemeral port should bind");
    let addr = listener
        .local_addr()
        .expect("listener should have an address");
    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("test server should run");
    });
    addr
}

pub async fn spawn_identity() -> TestServer {
    let (dir, db) = scratch_db(Schema::Identity).await;
    let hashing = HashingConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    };
    let state = IdentityState::new(db.clone(), &token_config(), hashing)
        .expect("identity state should build");
    TestServer {
        addr: serve(identity_app(state)).await,
        db,
        _dir: dir,
    }
}

/// Inventory service verifying subjects against `verify_url`.
pub async fn spawn_inventory(verify_url: &str, timeout: Duration) -> TestServer {
    let (dir, db) = scratch_db(Schema::Inventory).await;
    let verifier = VerifierConfig {
        endpoint: Url::parse(verify_url).expect("verify URL should parse"),
        timeout,
    };
    let state = InventoryState::new(db.clone(), &token_config(), &verifier)
        .expect("inventory state should build");
    TestServer {
        addr: serve(inventory_app(state)).await,
        db,
        _dir: dir,
    }
}

pub fn car_body(id: i64, name: &str, stock: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "brand": "Toyota",
        "model": "Corolla",
        "year": 2022,
        "price": 45.5,
        "color": "blue",
        "description": "compact",
        "stock": stock,
    })
}

pub async fn create_car(client: &Client, inventory: &TestServer, id: i64, stock: i64) {
    let response = client
        .post(inventory.url("/cars"))
        .json(&car_body(id, &format!("car-{id}"), stock))
        .send()
        .await
        .expect("create request should complete");
    assert_eq!(response.status(), 201);
}

pub async fn stock_of(client: &Client, inventory: &TestServer, id: i64) -> i64 {
    let body: Value = client
        .get(inventory.url(&format!("/cars/{id}")))
        .send()
        .await
        .expect("get request should complete")
        .json()
        .await
        .expect("body should be JSON");
    body["car"]["stock"].as_i64().expect("stock should be a number")
}

/// Register `email` and return a bearer token for it.
pub async fn register_and_login(client: &Client, identity: &TestServer, email: &str) -> String {
    let username = email.split('@').next().unwrap_or(email);
    let response = client
        .post(identity.url("/register"))
        .json(&json!({ "email": email, "username": username, "password": PASSWORD }))
        .send()
        .await
        .expect("register request should complete");
    assert_eq!(response.status(), 201);

    let body: Value = client
        .post(identity.url("/login"))
        .json(&json!({ "email": email, "password": PASSWORD }))
        .send()
        .await
        .expect("login request should complete")
        .json()
        .await
        .expect("login body should be JSON");
    body["token"]
        .as_str()
        .expect("login should return a token")
        .to_string()
}
