use homeroom::config::{AppConfig, Backend, ConfigError, DEFAULT_BIND};
use serial_test::serial;

const VARS: [&str; 5] = [
    "HOMEROOM_BACKEND",
    "HOMEROOM_DATA_DIR",
    "HOMEROOM_REMOTE_URL",
    "HOMEROOM_BIND",
    "FRONTEND_URL",
];

fn clear_env() {
    for v in VARS {
        std::env::remove_var(v);
    }
}

#[test]
#[serial]
fn defaults_to_local_backend() {
    clear_env();
    let cfg = AppConfig::from_env().unwrap();
    assert_eq!(cfg.backend, Backend::Local);
    assert_eq!(cfg.data_dir, std::path::PathBuf::from("data"));
    assert_eq!(cfg.bind, DEFAULT_BIND);
    assert!(cfg.frontend_url.is_none());
}

#[test]
#[serial]
fn remote_backend_needs_url() {
    clear_env();
    std::env::set_var("HOMEROOM_BACKEND", "Remote");
    assert_eq!(AppConfig::from_env().unwrap_err(), ConfigError::MissingRemoteUrl);

    std::env::set_var("HOMEROOM_REMOTE_URL", "https://script.example/exec");
    let cfg = AppConfig::from_env().unwrap();
    assert_eq!(cfg.backend, Backend::Remote);
    assert_eq!(cfg.remote_url.as_deref(), Some("https://script.example/exec"));
    clear_env();
}

#[test]
#[serial]
fn invalid_values_fall_back() {
    clear_env();
    std::env::set_var("HOMEROOM_BACKEND", "postgres");
    std::env::set_var("HOMEROOM_BIND", "   ");
    let cfg = AppConfig::from_env().unwrap();
    assert_eq!(cfg.backend, Backend::Local);
    assert_eq!(cfg.bind, DEFAULT_BIND);
    clear_env();
}
