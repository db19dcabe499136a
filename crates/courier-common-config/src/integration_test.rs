use std::env;
use std::fs;
use tempfile::tempdir;

use super::*;

#[test]
fn test_full_config_loading_workflow() {
    env::set_var("COURIER_IT_ATTEMPTS", "4");
    env::set_var("COURIER_IT_AGENT", "courier-it/1.0");

    let dir = tempdir().unwrap();
    let courier_dir = dir.path().join(CONFIG_DIR);
    fs::create_dir_all(&courier_dir).unwrap();

    let config_content = r#"
retry:
  max_attempts: ${COURIER_IT_ATTEMPTS}
  backoff: exponential
  initial_delay_ms: ${COURIER_IT_DELAY:-200}
  multiplier: 3.0

http:
  user_agent: ${COURIER_IT_AGENT}
  gzip: false

# runtime uses defaults
"#;

    fs::write(courier_dir.join(CONFIG_FILE), config_content).unwrap();

    let loader = ConfigLoader::new(dir.path());
    let config = loader.load().unwrap();

    assert_eq!(config.retry.max_attempts, 4);
    assert_eq!(config.retry.initial_delay_ms, 200);
    assert_eq!(config.retry.multiplier, 3.0);
    assert_eq!(config.retry.max_delay_ms, 10_000);
    assert_eq!(config.http.user_agent.as_deref(), Some("courier-it/1.0"));
    assert!(!config.http.gzip);
    assert_eq!(config.runtime, RuntimeSettings::default());

    let mut modified = config.clone();
    modified.retry.max_attempts = 10;
    loader.save(&modified).unwrap();

    let reloaded = loader.load().unwrap();
    assert_eq!(reloaded.retry.max_attempts, 10);

    env::remove_var("COURIER_IT_ATTEMPTS");
    env::remove_var("COURIER_IT_AGENT");
}
