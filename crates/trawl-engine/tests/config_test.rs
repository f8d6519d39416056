use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use trawl_engine::config::loader::ConfigLoader;
use trawl_engine::config::schema::TrawlConfig;
use trawl_engine::session::SessionSettings;

#[test]
fn test_default_values() {
    let config = TrawlConfig::default();
    assert!(config.browser.visible);
    assert_eq!(config.session.poll_interval_ms, 3000);
    assert_eq!(config.session.container_timeout_ms, 1000);
    assert_eq!(config.login.settle_ms, 3000);
    assert_eq!(config.login.manual_wait_ms, 60000);
    assert_eq!(config.single_shot.container_timeout_ms, 10000);
    assert_eq!(
        config.output.path,
        PathBuf::from("static").join("scraped_data.json")
    );
}

#[tokio::test]
async fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
browser:
  visible: false
session:
  poll_interval_ms: 500
login:
  manual_wait_ms: 120000
output:
  path: "/tmp/trawl/out.json"
    "#
    )
    .unwrap();

    let config = ConfigLoader::load_from(file.path())
        .await
        .expect("Failed to load config from file");

    assert!(!config.browser.visible);
    assert_eq!(config.session.poll_interval_ms, 500);
    // Keys missing from a present section still get their defaults.
    assert_eq!(config.session.container_timeout_ms, 1000);
    assert_eq!(config.login.manual_wait_ms, 120000);
    assert_eq!(config.login.settle_ms, 3000);
    assert_eq!(config.output.path, PathBuf::from("/tmp/trawl/out.json"));

    let settings = SessionSettings::from(&config);
    assert_eq!(settings.poll_interval.as_millis(), 500);
    assert_eq!(settings.login.manual_wait().as_secs(), 120);
}

#[test]
fn test_empty_document_is_default() {
    let config = ConfigLoader::parse("  \n").unwrap();
    assert_eq!(config.session.poll_interval_ms, 3000);
}

#[test]
fn test_invalid_yaml_is_rejected() {
    assert!(ConfigLoader::parse("session: [1, 2").is_err());
    assert!(ConfigLoader::parse("session:\n  poll_interval_ms: soon").is_err());
}

#[tokio::test]
async fn test_load_from_nonexistent_file() {
    let result =
        ConfigLoader::load_from(std::path::Path::new("/nonexistent/path/trawl.yaml")).await;
    assert!(result.is_err());
}
