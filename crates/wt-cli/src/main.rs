#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::Parser;

use wt_bridge::tls::{self, CertPaths};
use wt_bridge::AppState;
use wt_core::config::Config;
use wt_core::settings::SettingsManager;

/// webtty -- share a terminal session with one or more browsers over a
/// websocket bridge.
#[derive(Parser, Debug)]
#[command(name = "webtty", version, about)]
struct Cli {
    /// Address to bind.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind.
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Shell command to run for freshly created sessions (overrides $SHELL).
    #[arg(short = 'c', long = "cmd")]
    shell: Option<String>,

    /// Serve over TLS.
    #[arg(long, conflicts_with = "no_tls")]
    tls: bool,

    /// Serve without TLS (overrides a config file's `tls.enabled`).
    #[arg(long)]
    no_tls: bool,

    /// Directory holding (or to hold) the TLS certificate/key pair.
    #[arg(long)]
    cert_dir: Option<String>,

    /// (Re)generate the self-signed CA and server certificate before
    /// starting, even if one already exists at `--cert-dir`.
    #[arg(long)]
    generate_certs: bool,

    /// Default terminal color theme.
    #[arg(long)]
    theme: Option<String>,

    /// Path to a message-of-the-day file shown at the start of new sessions.
    #[arg(long)]
    motd: Option<String>,

    /// Record each session's output to `--session-log-dir` in
    /// `script`/`scriptreplay` format.
    #[arg(long)]
    enable_session_log: bool,

    /// Directory session logs are written under (see `--enable-session-log`).
    #[arg(long)]
    session_log_dir: Option<String>,

    /// Emit JSON-formatted logs instead of human-readable ones.
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    /// CLI flags outrank environment variables, which outrank the config
    /// file (`wt_core::settings::SettingsManager` + `apply_env_overrides`).
    fn apply_to(&self, mut config: Config) -> Config {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(shell) = &self.shell {
            config.pty.shell = shell.clone();
        }
        if self.tls {
            config.tls.enabled = true;
        }
        if self.no_tls {
            config.tls.enabled = false;
        }
        if let Some(cert_dir) = &self.cert_dir {
            config.tls.cert_dir = cert_dir.clone();
        }
        if let Some(theme) = &self.theme {
            config.ui.theme = theme.clone();
        }
        if let Some(motd) = &self.motd {
            config.ui.motd_path = Some(motd.clone());
        }
        if self.enable_session_log {
            config.session_log.enabled = true;
        }
        if let Some(dir) = &self.session_log_dir {
            config.session_log.dir = Some(dir.clone());
        }
        if self.log_json {
            config.logging.json = true;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = SettingsManager::default_path();
    let config = if settings.path().exists() {
        settings.load().unwrap_or_else(|e| {
            eprintln!("warning: failed to load config file, using defaults: {e}");
            Config::default()
        })
    } else {
        Config::default()
    }
    .apply_env_overrides();
    let config = cli.apply_to(config);

    if config.logging.json {
        wt_telemetry::logging::init_logging_json("webtty", &config.logging.level);
    } else {
        wt_telemetry::logging::init_logging("webtty", &config.logging.level);
    }

    let cert_paths = if config.tls.enabled {
        Some(resolve_certs(&config, cli.generate_certs)?)
    } else {
        None
    };

    let state = AppState::new(config);
    wt_bridge::serve::serve(state, cert_paths).await?;

    Ok(())
}

/// Generate the self-signed CA/server certificate pair when absent or when
/// `--generate-certs` was passed explicitly; otherwise reuse what is
/// already on disk at `config.tls.cert_dir`.
fn resolve_certs(config: &Config, force_regenerate: bool) -> anyhow::Result<CertPaths> {
    let cert_dir = PathBuf::from(&config.tls.cert_dir);
    if force_regenerate || !tls::certs_exist(&cert_dir) {
        tls::generate_self_signed(&cert_dir, &config.server.host)
            .map_err(|e| anyhow::anyhow!("failed to provision TLS certificate: {e}"))
    } else {
        Ok(tls::cert_paths(&cert_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_flags_match_the_declared_clap_surface() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_loaded_config_when_present() {
        let cli = Cli::parse_from([
            "webtty",
            "--host",
            "0.0.0.0",
            "--port",
            "9999",
            "--tls",
            "--theme",
            "solarized-dark",
        ]);
        let config = cli.apply_to(Config::default());
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9999);
        assert!(config.tls.enabled);
        assert_eq!(config.ui.theme, "solarized-dark");
        // Flags not passed leave the rest of the config untouched.
        assert_eq!(config.pty.shell, Config::default().pty.shell);
    }

    #[test]
    fn absent_flags_never_override_a_loaded_config() {
        let cli = Cli::parse_from(["webtty"]);
        let mut config = Config::default();
        config.server.port = 12345;
        config.ui.theme = "dark".into();
        let config = cli.apply_to(config);
        assert_eq!(config.server.port, 12345);
        assert_eq!(config.ui.theme, "dark");
    }

    #[test]
    fn no_tls_flag_disables_tls_even_if_config_enabled_it() {
        let cli = Cli::parse_from(["webtty", "--no-tls"]);
        let mut config = Config::default();
        config.tls.enabled = true;
        let config = cli.apply_to(config);
        assert!(!config.tls.enabled);
    }

    #[test]
    fn tls_and_no_tls_are_mutually_exclusive() {
        let result = Cli::try_parse_from(["webtty", "--tls", "--no-tls"]);
        assert!(result.is_err());
    }
}
