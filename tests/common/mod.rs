#![allow(dead_code)]

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, header::SET_COOKIE},
    response::Response,
};
use cookie::Cookie;
use gatehouse::{
    api::{self, AppState, GatePolicy},
    identity::IdentityClient,
    session::CookieConfig,
};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::{Value, json};
use std::{net::TcpListener, sync::Arc};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path, query_param},
};

/// Nothing listens on the discard port, calls fail fast with a network error.
pub const UNREACHABLE: &str = "http://127.0.0.1:9";

pub fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

pub fn app(identity_url: &str) -> Result<Router> {
    let identity = IdentityClient::new(
        identity_url,
        SecretString::from("anon-key".to_string()),
        SecretString::from("service-key".to_string()),
    )?;
    let state = AppState::new(
        identity,
        CookieConfig::new(false),
        GatePolicy::default(),
        "/reset-password".to_string(),
    );
    Ok(api::app(Arc::new(state), None))
}

pub fn get(uri: &str, cookie: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    Ok(builder.body(Body::empty())?)
}

pub fn post_json(uri: &str, cookie: Option<&str>, body: &Value) -> Result<Request<Body>> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    Ok(builder.body(Body::from(body.to_string()))?)
}

pub fn set_cookies(headers: &HeaderMap) -> Vec<Cookie<'static>> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| Cookie::parse_encoded(value.to_string()).ok())
        .collect()
}

pub fn max_age(cookies: &[Cookie<'static>], name: &str) -> Option<i64> {
    cookies
        .iter()
        .find(|cookie| cookie.name() == name)
        .and_then(Cookie::max_age)
        .map(|age| age.whole_seconds())
}

pub fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get("location")
        .and_then(|value| value.to_str().ok())
}

pub async fn json_body(response: Response) -> Result<Value> {
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}

/// `access` resolves to `user_id` with `role` on the profile row.
pub async fn mount_user(server: &MockServer, access: &str, user_id: &str, role: &str) {
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", format!("Bearer {access}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": user_id,
            "email": format!("{user_id}@example.com"),
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("id", format!("eq.{user_id}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "role": role }])))
        .mount(server)
        .await;
}

/// `stale` is rejected and `refresh-1` rotates to `fresh`/`refresh-2`.
pub async fn mount_refresh(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "msg": "invalid JWT: token is expired" })),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "refresh_token": "refresh-2",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(server)
        .await;
}
