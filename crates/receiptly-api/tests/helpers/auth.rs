//! Session and authorization helpers for integration tests.

use axum::http::header;
use axum_test::{TestResponse, TestServer};

use super::fakes::TEST_AUTH_CODE;

/// `name=value` part of the response's session cookie, if one was set.
pub fn session_cookie(response: &TestResponse) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("receiptly_session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// Location header of a redirect.
pub fn location(response: &TestResponse) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect without Location")
        .to_str()
        .unwrap()
        .to_string()
}

/// `state` query parameter of the identity provider URL.
pub fn state_param(authorize_url: &str) -> String {
    authorize_url
        .split("state=")
        .nth(1)
        .and_then(|rest| rest.split('&').next())
        .expect("authorize URL without state")
        .to_string()
}

/// Start a fresh session and run it through the OAuth handshake.
///
/// Returns the session cookie to send with later requests.
pub async fn login(client: &TestServer) -> String {
    let response = client.get("/authorize").await;
    assert_eq!(response.status_code(), 303);
    let cookie = session_cookie(&response).expect("new session must set a cookie");
    let state = state_param(&location(&response));

    let response = client
        .get(&format!("/callback?code={}&state={}", TEST_AUTH_CODE, state))
        .add_header("Cookie", cookie.clone())
        .await;
    assert_eq!(response.status_code(), 303);
    assert_eq!(location(&response), "/");

    cookie
}

/// A session cookie that never went through authorization.
pub async fn anonymous_session(client: &TestServer) -> String {
    let response = client.get("/").await;
    session_cookie(&response).expect("new session must set a cookie")
}
