use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::debug;

/// Browser-session cookie holding the visitor's session id.
pub const SESSION_COOKIE: &str = "session-id";

/// Returns the session id carried by `jar`, minting one when the browser has
/// none yet. The returned jar must be sent back with the response.
pub fn ensure_session(jar: CookieJar, now: DateTime<Utc>) -> (CookieJar, String) {
    if let Some(id) = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|id| !id.is_empty())
    {
        return (jar, id);
    }

    let id = new_session_id(now);
    debug!(session_id = %id, "started new session");
    (jar.add(session_cookie(id.clone())), id)
}

/// No `Max-Age` or `Expires`, so the browser drops it when the session ends.
fn session_cookie(id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Base-36 millisecond timestamp followed by a random base-36 suffix.
pub fn new_session_id(now: DateTime<Utc>) -> String {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or_default();
    let suffix: u64 = rand::thread_rng().r#gen();
    format!("{}{}", to_base36(millis), to_base36(suffix))
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
