//! Tests for configuration file loading
//!
//! - missing file → defaults, no error
//! - partial file → remaining fields keep their defaults
//! - invalid numeral table → configuration error

use std::io::Write;

use svs_common::config::ServiceConfig;
use svs_common::Error;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config_file() {
    let file = write_config(
        r#"
        bind_addr = "0.0.0.0:8080"
        database_path = "/var/lib/svs/serials.db"
        callback_token = "kave-callback"
        admin_token = "secret"
        identifier_width = 24
        numeral_alphabets = ["۰۱۲۳۴۵۶۷۸۹", "٠١٢٣٤٥٦٧٨٩", "०१२३४५६७८९"]
        database_max_lock_wait_ms = 2500

        [notifier]
        url = "https://api.sms.example/v1/send.json"
        max_attempts = 4
        initial_backoff_ms = 100
        max_backoff_ms = 800
        timeout_ms = 3000
        "#,
    );

    let config = ServiceConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.bind_addr, "0.0.0.0:8080");
    assert_eq!(config.callback_token, "kave-callback");
    assert_eq!(config.identifier_width, 24);
    assert_eq!(config.numeral_alphabets.len(), 3);
    assert_eq!(config.notifier.max_attempts, 4);

    let normalizer = config.normalizer().unwrap();
    assert_eq!(normalizer.width(), 24);
    assert_eq!(
        normalizer.normalize("ab१२").unwrap(),
        normalizer.normalize("AB12").unwrap()
    );
}

#[test]
fn test_empty_file_is_all_defaults() {
    let file = write_config("");
    assert_eq!(ServiceConfig::load(Some(file.path())).unwrap(), ServiceConfig::default());
}

#[test]
fn test_zero_width_rejected() {
    let file = write_config("identifier_width = 0");
    assert!(matches!(
        ServiceConfig::load(Some(file.path())),
        Err(Error::Config(_))
    ));
}

#[test]
fn test_zero_notifier_attempts_rejected() {
    let file = write_config("[notifier]\nmax_attempts = 0");
    assert!(matches!(
        ServiceConfig::load(Some(file.path())),
        Err(Error::Config(_))
    ));
}

#[test]
fn test_unknown_field_type_rejected() {
    let file = write_config("identifier_width = \"wide\"");
    assert!(ServiceConfig::load(Some(file.path())).is_err());
}
