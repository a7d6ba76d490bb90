use wt_core::config::Config;

#[test]
fn default_config() {
    let cfg = Config::default();
    assert_eq!(cfg.server.host, "127.0.0.1");
    assert_eq!(cfg.server.port, 7681);
    assert_eq!(cfg.server.prefix, "ws");
    assert_eq!(cfg.history.capacity_bytes, 50 * 1024);
    assert_eq!(cfg.logging.level, "info");
    assert!(!cfg.tls.enabled);
    assert_eq!(cfg.ui.theme, "default");
    assert!(!cfg.session_log.enabled);
}

#[test]
fn config_roundtrip() {
    let cfg = Config::default();
    let toml_str = cfg.to_toml().expect("serialize to toml");
    assert!(toml_str.contains("7681"));

    let parsed: Config = toml::from_str(&toml_str).expect("parse toml back");
    assert_eq!(parsed.server.port, cfg.server.port);
    assert_eq!(parsed.history.capacity_bytes, cfg.history.capacity_bytes);
}

#[test]
fn config_partial_toml() {
    let partial = r#"
[server]
port = 1234

[pty]
shell = "/bin/zsh"
"#;
    let cfg: Config = toml::from_str(partial).expect("parse partial");
    assert_eq!(cfg.server.port, 1234);
    assert_eq!(cfg.pty.shell, "/bin/zsh");
    // defaults should fill in the rest
    assert_eq!(cfg.server.host, "127.0.0.1");
    assert_eq!(cfg.history.capacity_bytes, 50 * 1024);
}

#[test]
fn env_overrides_take_precedence_over_file() {
    std::env::set_var("WEBTTY_HOST", "0.0.0.0");
    std::env::set_var("WEBTTY_THEME", "solarized-dark");
    let cfg = Config::default().apply_env_overrides();
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.ui.theme, "solarized-dark");
    std::env::remove_var("WEBTTY_HOST");
    std::env::remove_var("WEBTTY_THEME");
}
