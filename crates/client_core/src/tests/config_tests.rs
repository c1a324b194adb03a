use super::{apply_env_overrides, load_settings, parse_settings, Settings};

use std::{
    collections::HashMap,
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn defaults_point_at_local_backend() {
    let settings = Settings::default();
    assert_eq!(settings.api_base_url, "http://127.0.0.1:8000");
    assert_eq!(settings.request_timeout_secs, None);
    assert_eq!(settings.event_buffer, 256);
}

#[test]
fn partial_file_keeps_other_defaults() {
    let settings = parse_settings("api_base_url = \"https://tours.example.com\"\n").expect("parse");
    assert_eq!(settings.api_base_url, "https://tours.example.com");
    assert_eq!(settings.event_buffer, 256);
}

#[test]
fn malformed_file_is_an_error() {
    assert!(parse_settings("event_buffer = \"lots\"").is_err());
}

#[test]
fn app_prefixed_env_wins_over_short_form() {
    let mut settings = Settings::default();
    apply_env_overrides(
        &mut settings,
        lookup(&[
            ("TOUR_API_URL", "http://short"),
            ("APP__API_BASE_URL", "http://app"),
            ("APP__REQUEST_TIMEOUT_SECS", "30"),
            ("APP__EVENT_BUFFER", "8"),
        ]),
    );
    assert_eq!(settings.api_base_url, "http://app");
    assert_eq!(settings.request_timeout_secs, Some(30));
    assert_eq!(settings.event_buffer, 8);
}

#[test]
fn invalid_env_values_are_ignored() {
    let mut settings = Settings {
        request_timeout_secs: Some(9),
        ..Settings::default()
    };
    apply_env_overrides(
        &mut settings,
        lookup(&[
            ("APP__REQUEST_TIMEOUT_SECS", "soon"),
            ("APP__EVENT_BUFFER", "0"),
        ]),
    );
    assert_eq!(settings.request_timeout_secs, Some(9));
    assert_eq!(settings.event_buffer, 256);
}

#[test]
fn zero_timeout_disables_it() {
    let mut settings = Settings {
        request_timeout_secs: Some(9),
        ..Settings::default()
    };
    apply_env_overrides(&mut settings, lookup(&[("APP__REQUEST_TIMEOUT_SECS", "0")]));
    assert_eq!(settings.request_timeout_secs, None);
}

#[test]
fn explicit_missing_file_is_an_error() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("tour_client_missing_{suffix}.toml"));
    let err = load_settings(Some(&path)).expect_err("must fail");
    assert!(err.to_string().contains("failed to read config file"));
}

#[test]
fn loads_explicit_file() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("tour_client_test_{suffix}.toml"));
    fs::write(&path, "event_buffer = 32\nrequest_timeout_secs = 4\n").expect("write");

    let settings = load_settings(Some(&path)).expect("load");
    assert_eq!(settings.event_buffer, 32);

    fs::remove_file(path).expect("cleanup");
}
