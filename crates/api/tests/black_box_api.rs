use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use movierent_accounts::{JwtClaims, RegisterUser, Role, User, hash_password};
use movierent_core::UserId;
use movierent_events::{EmailKind, EmailMessage, EventBus, InMemoryEventBus, Subscription};
use movierent_infra::UserStore;

const JWT_SECRET: &str = "test-secret";
const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "Admin123";

struct TestServer {
    base_url: String,
    emails: Subscription<EmailMessage>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let image_dir = std::env::temp_dir().join(format!("movierent-api-test-{}", uuid::Uuid::new_v4()));
        let (services, bus) = movierent_api::app::services::build_in_memory_services(JWT_SECRET, image_dir)
            .await
            .expect("failed to build services");
        let emails = subscribe(&bus);

        let admin = User::register(
            RegisterUser {
                email: ADMIN_EMAIL.to_string(),
                full_name: "Admin User".to_string(),
                phone_number: None,
                address: None,
            },
            hash_password(ADMIN_PASSWORD, 4).unwrap(),
            Utc::now(),
        )
        .unwrap()
        .with_role(Role::admin());
        services.store.insert_user(admin).await.unwrap();

        // Build app (same router as prod), but bind to an ephemeral port.
        let app = movierent_api::app::build_app(Arc::new(services));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            emails,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn subscribe(bus: &Arc<InMemoryEventBus<EmailMessage>>) -> Subscription<EmailMessage> {
    bus.subscribe()
}

fn mint_jwt(user_id: UserId, roles: Vec<Role>) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: user_id,
        email: "someone@example.com".to_string(),
        roles,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

/// Emails are published off the request path; poll briefly until one shows up.
async fn next_email(srv: &TestServer) -> EmailMessage {
    for _ in 0..100 {
        if let Ok(message) = srv.emails.try_recv() {
            return message;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    panic!("no email was enqueued within timeout");
}

async fn register(client: &reqwest::Client, srv: &TestServer, email: &str, name: &str) -> Value {
    let res = client
        .post(srv.url("/auth/register"))
        .json(&json!({
            "email": email,
            "password": "Secret123",
            "full_name": name,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

async fn login(client: &reqwest::Client, srv: &TestServer, email: &str, password: &str) -> String {
    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

async fn create_movie(client: &reqwest::Client, srv: &TestServer, admin: &str, body: Value) -> Value {
    let res = client
        .post(srv.url("/admin/movies"))
        .bearer_auth(admin)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

async fn get_json(client: &reqwest::Client, url: String, token: Option<&str>) -> (StatusCode, Value) {
    let mut req = client.get(url);
    if let Some(token) = token {
        req = req.bearer_auth(token);
    }
    let res = req.send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap_or(Value::Null))
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let client = reqwest::Client::new();
    let res = client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(srv.url("/rentals"))
        .bearer_auth("not-a-jwt")
        .json(&json!({ "movie_id": UserId::new().to_string() }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthenticated");

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn principal_is_derived_from_token() {
    let srv = TestServer::spawn().await;

    let user_id = UserId::new();
    let token = mint_jwt(user_id, vec![Role::admin()]);

    let client = reqwest::Client::new();
    let (status, body) = get_json(&client, srv.url("/whoami"), Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"].as_str().unwrap(), user_id.to_string());
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "admin"));
}

#[tokio::test]
async fn registration_login_and_profile() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let user = register(&client, &srv, "Jane@Example.com", "Jane Smith").await;
    assert_eq!(user["email"], "jane@example.com");
    assert_eq!(user["is_admin"], false);
    assert!(user.get("password_hash").is_none());

    let email = next_email(&srv).await;
    assert_eq!(email.kind, EmailKind::Registration);
    assert_eq!(email.to, "jane@example.com");
    assert_eq!(email.user_name.as_deref(), Some("Jane Smith"));

    // Same email again.
    let res = client
        .post(srv.url("/auth/register"))
        .json(&json!({ "email": "jane@example.com", "password": "Secret123", "full_name": "Other" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // Too-short password.
    let res = client
        .post(srv.url("/auth/register"))
        .json(&json!({ "email": "short@example.com", "password": "abc", "full_name": "Short" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "jane@example.com", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let token = login(&client, &srv, "jane@example.com", "Secret123").await;
    let id = user["id"].as_str().unwrap();

    let res = client
        .put(srv.url(&format!("/users/{id}")))
        .bearer_auth(&token)
        .json(&json!({ "full_name": "Jane S.", "phone_number": "555-0101", "address": "1 Main St" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["full_name"], "Jane S.");
    assert_eq!(updated["email"], "jane@example.com");

    // Someone else's profile is off limits.
    let other = register(&client, &srv, "john@example.com", "John Doe").await;
    let (status, _) = get_json(
        &client,
        srv.url(&format!("/users/{}", other["id"].as_str().unwrap())),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Admins may read anyone.
    let admin = login(&client, &srv, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let (status, body) = get_json(&client, srv.url(&format!("/users/{id}")), Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Jane S.");
}

#[tokio::test]
async fn rental_lifecycle_moves_stock() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let admin = login(&client, &srv, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let movie = create_movie(
        &client,
        &srv,
        &admin,
        json!({
            "title": "Inception",
            "release_year": 2010,
            "director": "Christopher Nolan",
            "duration": 148,
            "actors": ["Leonardo DiCaprio"],
            "categories": ["Sci-Fi"],
            "stock_quantity": 1,
        }),
    )
    .await;
    let movie_id = movie["id"].as_str().unwrap().to_string();
    assert_eq!(movie["duration_minutes"], 148);
    assert_eq!(movie["average_rating"], 0.0);

    let user = register(&client, &srv, "renter@example.com", "Rita Renter").await;
    let _welcome = next_email(&srv).await;
    let token = login(&client, &srv, "renter@example.com", "Secret123").await;

    // Order the only copy.
    let res = client
        .post(srv.url("/rentals"))
        .bearer_auth(&token)
        .json(&json!({ "movie_id": movie_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let rental: Value = res.json().await.unwrap();
    let rental_id = rental["id"].as_str().unwrap().to_string();
    let code = rental["rental_code"].as_str().unwrap().to_string();
    assert_eq!(rental["status"], "ORDERED");
    assert_eq!(rental["movie_title"], "Inception");
    assert_eq!(rental["user_id"], user["id"]);
    assert_eq!(code.len(), 8);
    assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));

    let email = next_email(&srv).await;
    assert_eq!(email.kind, EmailKind::RentalConfirmation);
    assert_eq!(email.rental_code.as_deref(), Some(code.as_str()));
    assert_eq!(email.movie_title.as_deref(), Some("Inception"));

    // Out of stock now.
    let (_, body) = get_json(&client, srv.url(&format!("/movies/{movie_id}")), None).await;
    assert_eq!(body["stock_quantity"], 0);
    assert_eq!(body["available"], false);

    let res = client
        .post(srv.url("/rentals"))
        .bearer_auth(&token)
        .json(&json!({ "movie_id": movie_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "out_of_stock");

    // Lookup by code (case-insensitive).
    let (status, body) = get_json(
        &client,
        srv.url(&format!("/rentals/code/{}", code.to_lowercase())),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], rental_id.as_str());

    // Customers cannot hand out copies.
    let res = client
        .patch(srv.url(&format!("/admin/rentals/{rental_id}/take")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .patch(srv.url(&format!("/admin/rentals/{rental_id}/take")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "TAKEN");

    let (_, taken) = get_json(&client, srv.url("/admin/rentals/taken"), Some(&admin)).await;
    assert_eq!(taken.as_array().unwrap().len(), 1);

    // A movie with a copy out cannot be deleted.
    let res = client
        .delete(srv.url(&format!("/admin/movies/{movie_id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // Cancelling a taken rental restocks.
    let res = client
        .patch(srv.url(&format!("/rentals/{rental_id}/cancel")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "CANCELLED");
    assert!(body["return_date"].is_null());

    let (_, body) = get_json(&client, srv.url(&format!("/movies/{movie_id}")), None).await;
    assert_eq!(body["stock_quantity"], 1);

    // Terminal state: no further transitions, no second restock.
    let res = client
        .patch(srv.url(&format!("/rentals/{rental_id}/cancel")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let (_, body) = get_json(&client, srv.url(&format!("/movies/{movie_id}")), None).await;
    assert_eq!(body["stock_quantity"], 1);

    let (status, history) = get_json(
        &client,
        srv.url(&format!("/users/{}/rentals", user["id"].as_str().unwrap())),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);

    let res = client
        .delete(srv.url(&format!("/admin/movies/{movie_id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let (status, _) = get_json(&client, srv.url(&format!("/movies/{movie_id}")), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn take_then_return_restocks_once() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let admin = login(&client, &srv, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let movie = create_movie(&client, &srv, &admin, json!({ "title": "Heat", "stock_quantity": 2 })).await;
    let movie_id = movie["id"].as_str().unwrap().to_string();

    register(&client, &srv, "neil@example.com", "Neil McCauley").await;
    let token = login(&client, &srv, "neil@example.com", "Secret123").await;

    let res = client
        .post(srv.url("/rentals"))
        .bearer_auth(&token)
        .json(&json!({ "movie_id": movie_id }))
        .send()
        .await
        .unwrap();
    let rental: Value = res.json().await.unwrap();
    let rental_id = rental["id"].as_str().unwrap().to_string();

    // Returning before taking is an invalid transition.
    let res = client
        .patch(srv.url(&format!("/admin/rentals/{rental_id}/return")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    for step in ["take", "return"] {
        let res = client
            .patch(srv.url(&format!("/admin/rentals/{rental_id}/{step}")))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "{step} failed");
    }

    let (_, body) = get_json(&client, srv.url(&format!("/movies/{movie_id}")), None).await;
    assert_eq!(body["stock_quantity"], 2);

    let (_, rentals) = get_json(
        &client,
        srv.url("/admin/rentals?email=neil@example.com&status=returned"),
        Some(&admin),
    )
    .await;
    let rentals = rentals.as_array().unwrap();
    assert_eq!(rentals.len(), 1);
    assert_eq!(rentals[0]["status"], "RETURNED");
    assert!(!rentals[0]["return_date"].is_null());

    let (status, _) = get_json(&client, srv.url("/admin/rentals?email=ghost@example.com"), Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get_json(&client, srv.url("/admin/rentals?status=lost"), Some(&admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn catalog_search_and_ratings() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let admin = login(&client, &srv, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let matrix = create_movie(
        &client,
        &srv,
        &admin,
        json!({ "title": "The Matrix", "release_year": 1999, "categories": ["Sci-Fi", "Action"], "stock_quantity": 3 }),
    )
    .await;
    create_movie(
        &client,
        &srv,
        &admin,
        json!({ "title": "Amelie", "release_year": 2001, "categories": ["Romance"], "stock_quantity": 0 }),
    )
    .await;

    // Regular users cannot manage the catalog.
    register(&client, &srv, "neo@example.com", "Thomas Anderson").await;
    let token = login(&client, &srv, "neo@example.com", "Secret123").await;
    let res = client
        .post(srv.url("/admin/movies"))
        .bearer_auth(&token)
        .json(&json!({ "title": "Nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let matrix_id = matrix["id"].as_str().unwrap();
    for (score, expected) in [(9, StatusCode::BAD_REQUEST), (4, StatusCode::CREATED), (5, StatusCode::CREATED)] {
        let res = client
            .post(srv.url(&format!("/movies/{matrix_id}/ratings")))
            .bearer_auth(&token)
            .json(&json!({ "rating": score }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), expected);
    }

    // Re-rating replaced the score.
    let (_, ratings) = get_json(&client, srv.url(&format!("/movies/{matrix_id}/ratings")), None).await;
    let ratings = ratings.as_array().unwrap();
    assert_eq!(ratings.len(), 1);
    assert_eq!(ratings[0]["rating"], 5);
    assert_eq!(ratings[0]["user_full_name"], "Thomas Anderson");

    let (_, avg) = get_json(&client, srv.url(&format!("/movies/{matrix_id}/ratings/average")), None).await;
    assert_eq!(avg["average_rating"], 5.0);
    assert_eq!(avg["rating_count"], 1);

    let titles = |v: &Value| -> Vec<String> {
        v.as_array()
            .unwrap()
            .iter()
            .map(|m| m["title"].as_str().unwrap().to_string())
            .collect()
    };

    let (_, found) = get_json(&client, srv.url("/movies?category=sci-fi"), None).await;
    assert_eq!(titles(&found), vec!["The Matrix"]);

    let (_, found) = get_json(&client, srv.url("/movies?rating=4.5"), None).await;
    assert_eq!(titles(&found), vec!["The Matrix"]);

    let (_, found) = get_json(&client, srv.url("/movies?year=2001&search=ame"), None).await;
    assert_eq!(titles(&found), vec!["Amelie"]);

    let (_, found) = get_json(&client, srv.url("/movies/available"), None).await;
    assert_eq!(titles(&found), vec!["The Matrix"]);

    let (_, categories) = get_json(&client, srv.url("/categories"), None).await;
    assert_eq!(categories.as_array().unwrap().len(), 3);

    let (status, _) = get_json(&client, srv.url("/movies/not-a-uuid"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn image_upload_serve_and_replace() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = login(&client, &srv, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let upload = |bytes: Vec<u8>| {
        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(bytes).file_name("poster.png"),
        );
        client
            .post(srv.url("/admin/images"))
            .bearer_auth(&admin)
            .multipart(form)
            .send()
    };

    let res = upload(b"\x89PNG first".to_vec()).await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let first: Value = res.json().await.unwrap();
    let first_id = first["image_id"].as_str().unwrap().to_string();

    let res = upload(Vec::new()).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client.get(srv.url(&format!("/images/{first_id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "image/png");
    assert_eq!(res.bytes().await.unwrap().as_ref(), b"\x89PNG first");

    let movie = create_movie(
        &client,
        &srv,
        &admin,
        json!({ "title": "Alien", "image_id": first_id, "stock_quantity": 1 }),
    )
    .await;
    let movie_id = movie["id"].as_str().unwrap();

    let res = upload(b"\x89PNG second".to_vec()).await.unwrap();
    let second: Value = res.json().await.unwrap();
    let second_id = second["image_id"].as_str().unwrap().to_string();

    let res = client
        .put(srv.url(&format!("/admin/movies/{movie_id}")))
        .bearer_auth(&admin)
        .json(&json!({ "title": "Alien", "image_id": second_id, "stock_quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // The replaced poster is gone; the new one is served under the movie path too.
    let res = client.get(srv.url(&format!("/images/{first_id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let res = client
        .get(srv.url(&format!("/movies/images/{second_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .delete(srv.url(&format!("/images/{second_id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}
