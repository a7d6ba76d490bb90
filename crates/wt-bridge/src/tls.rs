//! TLS certificate provisioning for the CLI's `--generate-certs` flag: a
//! self-signed CA and a CA-signed per-host server certificate, written to a
//! cert directory. This shells out to the system `openssl` binary rather
//! than linking a TLS/crypto crate — the prior code never does TLS serving
//! itself, and no example repo in the pack demonstrates an axum-native TLS
//! listener, so this stays at the external-tool boundary (see DESIGN.md).

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to create cert directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),
    #[error("failed to launch openssl: {0}")]
    Spawn(std::io::Error),
    #[error("openssl exited non-zero while generating {0}")]
    NonZeroExit(&'static str),
}

pub type Result<T> = std::result::Result<T, TlsError>;

/// File layout for the CA and host-signed server certificate under a given
/// cert directory.
#[derive(Debug, Clone)]
pub struct CertPaths {
    pub ca_cert: PathBuf,
    pub ca_key: PathBuf,
    pub server_cert: PathBuf,
    pub server_key: PathBuf,
}

pub fn cert_paths(cert_dir: &Path) -> CertPaths {
    CertPaths {
        ca_cert: cert_dir.join("ca.pem"),
        ca_key: cert_dir.join("ca-key.pem"),
        server_cert: cert_dir.join("server.pem"),
        server_key: cert_dir.join("server-key.pem"),
    }
}

/// Whether a previously generated cert/key pair already exists at this
/// directory (used by the CLI to skip regeneration unless `--generate-certs`
/// was passed explicitly).
pub fn certs_exist(cert_dir: &Path) -> bool {
    let paths = cert_paths(cert_dir);
    paths.server_cert.exists() && paths.server_key.exists()
}

/// Generate a self-signed CA and a CA-signed leaf certificate for `host`
/// under `cert_dir`, by shelling out to `openssl`. Always (re)writes; the
/// CLI decides whether to call this based on `certs_exist` and the
/// `--generate-certs` flag.
pub fn generate_self_signed(cert_dir: &Path, host: &str) -> Result<CertPaths> {
    std::fs::create_dir_all(cert_dir)
        .map_err(|e| TlsError::CreateDir(cert_dir.to_path_buf(), e))?;
    let paths = cert_paths(cert_dir);
    let csr = cert_dir.join("server.csr");
    let serial = cert_dir.join("ca.srl");

    run_openssl(
        &["genrsa", "-out", path_str(&paths.ca_key), "4096"],
        "ca key",
    )?;
    run_openssl(
        &[
            "req", "-x509", "-new", "-nodes",
            "-key", path_str(&paths.ca_key),
            "-sha256", "-days", "3650",
            "-out", path_str(&paths.ca_cert),
            "-subj", "/CN=webtty-local-ca",
        ],
        "ca certificate",
    )?;
    run_openssl(
        &["genrsa", "-out", path_str(&paths.server_key), "2048"],
        "server key",
    )?;
    run_openssl(
        &[
            "req", "-new",
            "-key", path_str(&paths.server_key),
            "-out", path_str(&csr),
            "-subj", &format!("/CN={host}"),
        ],
        "server csr",
    )?;
    run_openssl(
        &[
            "x509", "-req",
            "-in", path_str(&csr),
            "-CA", path_str(&paths.ca_cert),
            "-CAkey", path_str(&paths.ca_key),
            "-CAcreateserial", "-CAserial", path_str(&serial),
            "-out", path_str(&paths.server_cert),
            "-days", "825", "-sha256",
        ],
        "server certificate",
    )?;

    let _ = std::fs::remove_file(&csr);
    let _ = std::fs::remove_file(&serial);
    Ok(paths)
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("cert paths are built from utf-8 components")
}

fn run_openssl(args: &[&str], step: &'static str) -> Result<()> {
    let status = Command::new("openssl")
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(TlsError::Spawn)?;
    if !status.success() {
        return Err(TlsError::NonZeroExit(step));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cert_paths_use_expected_filenames() {
        let paths = cert_paths(Path::new("/tmp/webtty-certs"));
        assert_eq!(paths.ca_cert, PathBuf::from("/tmp/webtty-certs/ca.pem"));
        assert_eq!(paths.server_key, PathBuf::from("/tmp/webtty-certs/server-key.pem"));
    }

    #[test]
    fn certs_exist_is_false_for_empty_directory() {
        let dir = std::env::temp_dir().join(format!("webtty-tls-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        assert!(!certs_exist(&dir));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    #[ignore = "requires the openssl binary on PATH"]
    fn generate_self_signed_writes_cert_and_key() {
        let dir = std::env::temp_dir().join(format!("webtty-tls-gen-{}", std::process::id()));
        let paths = generate_self_signed(&dir, "localhost").expect("openssl generation");
        assert!(paths.server_cert.exists());
        assert!(paths.server_key.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
