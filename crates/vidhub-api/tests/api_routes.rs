use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`

use vidhub_api::state::{AppStateInner, Settings};
use vidhub_db::Database;

struct TestApp {
    router: Router,
    _dir: TempDir,
}

fn app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let db = Database::open(&dir.path().join("api.db")).unwrap();
    let settings = Settings {
        access_token_secret: "test-access-secret".into(),
        refresh_token_secret: "test-refresh-secret".into(),
        access_token_ttl: chrono::Duration::minutes(5),
        refresh_token_ttl: chrono::Duration::days(1),
        store_timeout: Duration::from_secs(5),
    };
    TestApp {
        router: vidhub_api::router(AppStateInner::new(db, settings)),
        _dir: dir,
    }
}

impl TestApp {
    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let (status, _, json) = self.call(builder.body(body).unwrap()).await;
        (status, json)
    }

    /// Sends a prebuilt request, keeping the response headers.
    async fn call(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, json)
    }

    async fn register(&self, username: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/v1/users/register",
            None,
            Some(json!({
                "fullName": "Test User",
                "email": format!("{username}@example.com"),
                "username": username,
                "password": "password123",
                "avatar": "https://cdn.example.com/a.png",
            })),
        )
        .await
    }

    /// Logs in by email, returning (access token, user id).
    async fn login(&self, username: &str) -> (String, String) {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/users/login",
                None,
                Some(json!({ "email": format!("{username}@example.com"), "password": "password123" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        (
            body["data"]["accessToken"].as_str().unwrap().to_string(),
            body["data"]["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    async fn sign_up(&self, username: &str) -> (String, String) {
        let (status, _) = self.register(username).await;
        assert_eq!(status, StatusCode::CREATED);
        self.login(username).await
    }

    async fn publish(&self, token: &str, title: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/videos",
                Some(token),
                Some(json!({
                    "title": title,
                    "description": "about",
                    "videoFile": "https://cdn.example.com/v.mp4",
                    "thumbnail": "https://cdn.example.com/t.png",
                    "duration": 42.0,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn create_playlist(&self, token: &str, name: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/playlists",
                Some(token),
                Some(json!({ "name": name, "description": "mix" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

/// The `Set-Cookie` header for `name`, if the response carried one.
fn set_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{name}=")))
        .map(str::to_string)
}

/// The `name=value` pair of a `Set-Cookie` header, ready to send back.
fn cookie_pair(set_cookie: &str) -> &str {
    set_cookie.split(';').next().unwrap()
}

fn assert_failure(body: &Value, status: StatusCode, message: &str) {
    assert_eq!(body["statusCode"], status.as_u16());
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], message);
    assert_eq!(body["errors"], json!([]));
}

#[tokio::test]
async fn register_login_and_fetch_current_user() {
    let app = app();
    let (status, body) = app.register("alice").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["statusCode"], 201);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["username"], "alice");
    assert!(body["data"].get("password").is_none());

    let (token, user_id) = app.login("alice").await;
    let (status, body) = app.send(Method::GET, "/api/v1/users/current-user", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], user_id.as_str());
    assert_eq!(body["data"]["email"], "alice@example.com");
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = app();
    app.register("bob").await;
    let (status, body) = app.register("bob").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_failure(&body, StatusCode::CONFLICT, "User with same email or username already exists");
}

#[tokio::test]
async fn login_failures() {
    let app = app();
    app.register("carol").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/users/login",
            None,
            Some(json!({ "username": "nobody", "password": "password123" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_failure(&body, StatusCode::NOT_FOUND, "User does not exist");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/users/login",
            None,
            Some(json!({ "username": "carol", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = app();
    let routes = [
        (Method::GET, "/api/v1/users/current-user"),
        (Method::GET, "/api/v1/videos"),
        (Method::POST, "/api/v1/playlists"),
        (Method::POST, "/api/v1/reactions/video/3f2b8a1e-0000-4000-8000-000000000000"),
    ];
    for (method, uri) in routes {
        let (status, body) = app.send(method, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["success"], false);
    }

    let (status, _) = app
        .send(Method::GET, "/api/v1/users/current-user", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_token_is_single_use() {
    let app = app();
    app.register("dave").await;
    let (_, login) = app
        .send(
            Method::POST,
            "/api/v1/users/login",
            None,
            Some(json!({ "username": "dave", "password": "password123" })),
        )
        .await;
    let first = login["data"]["refreshToken"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/users/refresh-token",
            None,
            Some(json!({ "refreshToken": first })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(body["data"]["refreshToken"], first.as_str());

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/users/refresh-token",
            None,
            Some(json!({ "refreshToken": first })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn like_toggles_on_and_off() {
    let app = app();
    let (token, user_id) = app.sign_up("erin").await;
    let video = app.publish(&token, "first").await;
    let uri = format!("/api/v1/reactions/video/{video}");

    let (status, body) = app.send(Method::POST, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Video liked successfully, like toggled");
    assert_eq!(body["data"]["targetKind"], "video");
    assert_eq!(body["data"]["targetId"], video.as_str());
    assert_eq!(body["data"]["likedBy"], user_id.as_str());

    let (_, body) = app.send(Method::GET, &uri, Some(&token), None).await;
    assert_eq!(body["data"]["likeAmount"], 1);

    let (status, body) = app.send(Method::POST, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Video unliked successfully, like toggled");
    assert_eq!(body["data"], json!({}));

    let (status, body) = app.send(Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Video has 0 likes");
    assert_eq!(body["data"]["likeAmount"], 0);
    assert_eq!(body["data"]["likes"], json!([]));
}

#[tokio::test]
async fn like_on_missing_target_is_rejected() {
    let app = app();
    let (token, _) = app.sign_up("frank").await;
    let missing = uuid::Uuid::new_v4();

    let (status, body) = app
        .send(Method::POST, &format!("/api/v1/reactions/tweet/{missing}"), Some(&token), None)
        .await;
    assert_failure(&body, StatusCode::BAD_REQUEST, "Tweet does not exist");
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(Method::POST, &format!("/api/v1/reactions/playlist/{missing}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn videos_are_listed_by_likes() {
    let app = app();
    let (token, _) = app.sign_up("gina").await;
    let quiet = app.publish(&token, "quiet").await;
    let popular = app.publish(&token, "popular").await;
    app.send(Method::POST, &format!("/api/v1/reactions/video/{popular}"), Some(&token), None)
        .await;

    let (status, body) = app.send(Method::GET, "/api/v1/videos", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let page = &body["data"];
    assert_eq!(page["totalDocs"], 2);
    assert_eq!(page["page"], 1);
    assert_eq!(page["docs"][0]["id"], popular.as_str());
    assert_eq!(page["docs"][0]["likes"], 1);
    assert_eq!(page["docs"][1]["id"], quiet.as_str());
    assert_eq!(page["docs"][0]["createdBy"]["username"], "gina");

    let (status, _) = app.send(Method::GET, "/api/v1/videos?page=0", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn publish_status_flips_without_a_body() {
    let app = app();
    let (owner, _) = app.sign_up("hank").await;
    let (viewer, _) = app.sign_up("ivy").await;
    let video = app.publish(&owner, "draft").await;
    let uri = format!("/api/v1/videos/{video}/publish");

    let (status, body) = app.send(Method::PATCH, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isPublished"], false);

    let (status, _) = app
        .send(Method::GET, &format!("/api/v1/videos/{video}"), Some(&viewer), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send(Method::PATCH, &uri, Some(&viewer), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, body) = app
        .send(Method::PATCH, &uri, Some(&owner), Some(json!({ "isPublished": true })))
        .await;
    assert_eq!(body["data"]["isPublished"], true);
}

#[tokio::test]
async fn comments_are_owner_guarded() {
    let app = app();
    let (author, _) = app.sign_up("jack").await;
    let (other, _) = app.sign_up("kate").await;
    let video = app.publish(&author, "talk").await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/comments/video/{video}"),
            Some(&author),
            Some(json!({ "content": "first!" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let comment = body["data"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/v1/comments/{comment}");

    let (status, _) = app
        .send(Method::PATCH, &uri, Some(&other), Some(json!({ "content": "mine now" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.send(Method::DELETE, &uri, Some(&author), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({}));

    let (status, body) = app.send(Method::DELETE, &uri, Some(&author), None).await;
    assert_failure(&body, StatusCode::BAD_REQUEST, "Comment does not exist");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn playlist_membership_keeps_order() {
    let app = app();
    let (token, user_id) = app.sign_up("liam").await;
    let v1 = app.publish(&token, "one").await;
    let v2 = app.publish(&token, "two").await;
    let v3 = app.publish(&token, "three").await;
    let playlist = app.create_playlist(&token, "road trip").await;
    let member = |video: &str| format!("/api/v1/playlists/{playlist}/videos/{video}");

    for video in [&v1, &v2, &v3] {
        let (status, body) = app.send(Method::POST, &member(video), Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Video added successfully");
    }

    let (status, body) = app.send(Method::DELETE, &member(&v2), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["videos"], json!([v1, v3]));

    let (_, body) = app.send(Method::POST, &member(&v2), Some(&token), None).await;
    assert_eq!(body["data"]["videos"], json!([v1, v3, v2]));

    let (status, body) = app
        .send(Method::GET, &format!("/api/v1/playlists/{playlist}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["owner"]["id"], user_id.as_str());
    let titles: Vec<&str> = body["data"]["videos"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["one", "three", "two"]);

    let (status, body) = app
        .send(Method::GET, &format!("/api/v1/playlists/user/{user_id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["videoCount"], 3);
}

#[tokio::test]
async fn playlist_membership_failures() {
    let app = app();
    let (owner, _) = app.sign_up("mia").await;
    let (stranger, _) = app.sign_up("noah").await;
    let video = app.publish(&owner, "clip").await;
    let playlist = app.create_playlist(&owner, "faves").await;
    let uri = format!("/api/v1/playlists/{playlist}/videos/{video}");

    let (status, body) = app.send(Method::DELETE, &uri, Some(&owner), None).await;
    assert_failure(&body, StatusCode::BAD_REQUEST, "Video does not exist in playlist");
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.send(Method::POST, &uri, Some(&owner), None).await;
    let (status, body) = app.send(Method::POST, &uri, Some(&owner), None).await;
    assert_failure(&body, StatusCode::BAD_REQUEST, "Video already exists in playlist");
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.send(Method::DELETE, &uri, Some(&stranger), None).await;
    assert_failure(&body, StatusCode::UNAUTHORIZED, "Unauthorized access");
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let missing = uuid::Uuid::new_v4();
    let (_, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/playlists/{playlist}/videos/{missing}"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(body["message"], "Video does not exist");

    let (status, _) = app
        .send(Method::POST, "/api/v1/playlists", Some(&owner), Some(json!({ "name": "  " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_bodies_render_the_failure_envelope() {
    let app = app();
    let (token, _) = app.sign_up("olga").await;

    let (status, body) = app
        .send(Method::POST, "/api/v1/tweets", Some(&token), Some(json!({ "text": "hi" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = app
        .send(Method::GET, "/api/v1/tweets/not-a-uuid", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["statusCode"], 400);
}

#[tokio::test]
async fn unknown_routes_fall_through_to_404() {
    let app = app();
    let (status, body) = app.send(Method::GET, "/api/v1/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_failure(&body, StatusCode::NOT_FOUND, "Route not found");
}

#[tokio::test]
async fn jokes_are_a_bare_array() {
    let app = app();
    let (status, body) = app.send(Method::GET, "/api/jokes", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let jokes = body.as_array().unwrap();
    assert_eq!(jokes.len(), 5);
    assert_eq!(jokes[0]["id"], 1);
    assert_eq!(jokes[3]["joke"], "What do you call fake spaghetti? An impasta!");
}

#[tokio::test]
async fn wrong_method_on_a_known_path_is_enveloped() {
    let app = app();
    let (token, _) = app.sign_up("pete").await;

    let (status, body) = app.send(Method::PUT, "/api/v1/playlists", Some(&token), None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_failure(&body, StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");

    let (status, body) = app.send(Method::DELETE, "/api/jokes", None, None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_failure(&body, StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
}

#[tokio::test]
async fn publish_status_body_rejections_are_enveloped() {
    let app = app();
    let (token, _) = app.sign_up("quinn").await;
    let video = app.publish(&token, "clip").await;
    let uri = format!("/api/v1/videos/{video}/publish");

    let oversized = Request::builder()
        .method(Method::PATCH)
        .uri(&uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(vec![b' '; 64 * 1024]))
        .unwrap();
    let (status, _, body) = app.call(oversized).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["statusCode"], 413);
    assert_eq!(body["success"], false);

    let malformed = Request::builder()
        .method(Method::PATCH)
        .uri(&uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, body) = app.call(malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["statusCode"], 400);
    assert_eq!(body["success"], false);

    // Neither rejection touched the video.
    let (_, body) = app.send(Method::GET, &format!("/api/v1/videos/{video}"), Some(&token), None).await;
    assert_eq!(body["data"]["isPublished"], true);
}

#[tokio::test]
async fn unpublished_videos_are_hidden_from_other_users() {
    let app = app();
    let (owner, _) = app.sign_up("rosa").await;
    let (other, _) = app.sign_up("sam").await;
    let video = app.publish(&owner, "draft").await;
    let playlist = app.create_playlist(&owner, "drafts").await;
    app.send(Method::POST, &format!("/api/v1/playlists/{playlist}/videos/{video}"), Some(&owner), None)
        .await;
    app.send(Method::PATCH, &format!("/api/v1/videos/{video}/publish"), Some(&owner), None)
        .await;

    let reactions = format!("/api/v1/reactions/video/{video}");
    let comments = format!("/api/v1/comments/video/{video}");
    let others_playlist = app.create_playlist(&other, "stolen").await;
    let hidden = [
        (Method::POST, reactions.clone(), None),
        (Method::GET, reactions.clone(), None),
        (Method::POST, comments.clone(), Some(json!({ "content": "sneaky" }))),
        (Method::GET, comments.clone(), None),
        (Method::POST, format!("/api/v1/playlists/{others_playlist}/videos/{video}"), None),
    ];
    for (method, uri, body) in hidden {
        let (status, response) = app.send(method, &uri, Some(&other), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_failure(&response, StatusCode::BAD_REQUEST, "Video does not exist");
    }

    let detail = format!("/api/v1/playlists/{playlist}");
    let (_, body) = app.send(Method::GET, &detail, Some(&other), None).await;
    assert_eq!(body["data"]["videos"], json!([]));
    let (_, body) = app.send(Method::GET, &detail, Some(&owner), None).await;
    assert_eq!(body["data"]["videos"][0]["id"], video.as_str());

    // The owner still reaches their own draft.
    let (status, _) = app.send(Method::POST, &reactions, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .send(Method::POST, &comments, Some(&owner), Some(json!({ "content": "note to self" })))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_sets_http_only_token_cookies() {
    let app = app();
    app.register("tara").await;
    let login = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/users/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "username": "tara", "password": "password123" }).to_string()))
        .unwrap();
    let (status, headers, body) = app.call(login).await;
    assert_eq!(status, StatusCode::OK);

    let access = set_cookie(&headers, "accessToken").unwrap();
    let refresh = set_cookie(&headers, "refreshToken").unwrap();
    assert!(access.contains("HttpOnly"));
    assert!(refresh.contains("HttpOnly"));
    assert_eq!(
        cookie_pair(&access),
        format!("accessToken={}", body["data"]["accessToken"].as_str().unwrap())
    );

    // The cookie alone authenticates.
    let me = Request::builder()
        .uri("/api/v1/users/current-user")
        .header(header::COOKIE, cookie_pair(&access))
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = app.call(me).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "tara");

    // So does the refresh cookie, with no body at all.
    let rotate = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/users/refresh-token")
        .header(header::COOKIE, cookie_pair(&refresh))
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = app.call(rotate).await;
    assert_eq!(status, StatusCode::OK);
    let rotated = set_cookie(&headers, "refreshToken").unwrap();
    assert_eq!(
        cookie_pair(&rotated),
        format!("refreshToken={}", body["data"]["refreshToken"].as_str().unwrap())
    );
    assert_ne!(cookie_pair(&rotated), cookie_pair(&refresh));
}

#[tokio::test]
async fn logout_expires_both_cookies() {
    let app = app();
    let (token, _) = app.sign_up("uma").await;
    let logout = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/users/logout")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = app.call(logout).await;
    assert_eq!(status, StatusCode::OK);

    for name in ["accessToken", "refreshToken"] {
        let cleared = set_cookie(&headers, name).unwrap();
        assert_eq!(cookie_pair(&cleared), format!("{name}="));
        assert!(cleared.contains("Max-Age=0"), "{cleared}");
    }
}

#[tokio::test]
async fn account_email_must_stay_unique() {
    let app = app();
    let (token, _) = app.sign_up("vera").await;
    app.sign_up("walt").await;

    let (status, body) = app
        .send(
            Method::PATCH,
            "/api/v1/users/account",
            Some(&token),
            Some(json!({ "email": "walt@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_failure(&body, StatusCode::CONFLICT, "Email is already in use");

    let (status, body) = app
        .send(
            Method::PATCH,
            "/api/v1/users/account",
            Some(&token),
            Some(json!({ "email": "vera@example.com", "fullName": "Vera V" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["fullName"], "Vera V");
}
