//! Binds the router built by [`crate::router`] to a TCP listener, plain or
//! TLS. TLS serving uses `axum-server`'s rustls binding rather than a
//! hand-rolled acceptor loop, terminating TLS directly in front of the
//! axum `Router` without a separate reverse proxy.

use std::net::SocketAddr;
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use tracing::info;

use crate::tls::CertPaths;
use crate::AppState;

/// Run the server until the process is killed. `cert_paths` is required
/// when `state.config.tls.enabled`; the caller (the CLI) is responsible for
/// having generated the certificate pair first.
pub async fn serve(state: Arc<AppState>, cert_paths: Option<CertPaths>) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.config.server.host, state.config.server.port)
        .parse()?;
    let app = crate::router(state.clone());

    if state.config.tls.enabled {
        let paths = cert_paths
            .ok_or_else(|| anyhow::anyhow!("tls enabled but no certificate paths were resolved"))?;
        let tls_config = RustlsConfig::from_pem_file(&paths.server_cert, &paths.server_key).await?;
        info!(%addr, "listening (tls)");
        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(%addr, "listening");
        axum::serve(listener, app).await?;
    }

    Ok(())
}
