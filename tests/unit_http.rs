use gh_rate_limit_exporter::http::{bearer, decode_private_key, map_status_to_error, sign_app_jwt};
use reqwest::StatusCode;

const APP_KEY_PEM: &str = include_str!("fixtures/app-key.pem");

#[test]
fn status_error_mapping() {
    let e = map_status_to_error(StatusCode::TOO_MANY_REQUESTS, "rate".into());
    assert_eq!(e.code, "rate_limited");
    assert_eq!(e.message, "rate");
    let e = map_status_to_error(StatusCode::IM_A_TEAPOT, "".into());
    assert_eq!(e.code, "server_error");
}

#[test]
fn app_jwt_is_signed_with_rs256() {
    let key = decode_private_key(APP_KEY_PEM).unwrap();
    let jwt = sign_app_jwt(42, &key).unwrap();
    let parts: Vec<&str> = jwt.split('.').collect();
    assert_eq!(parts.len(), 3);
    assert!(parts.iter().all(|p| !p.is_empty()));
}

#[test]
fn bearer_header_is_sensitive() {
    let value = bearer("ghp_abc").unwrap();
    assert!(value.is_sensitive());
    assert_eq!(value.to_str().unwrap(), "Bearer ghp_abc");
}
