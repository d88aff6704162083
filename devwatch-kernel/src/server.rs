use crate::config::TlsConf;
use anyhow::{Context, Result};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Serves HTTPS with the configured PEM pair, or plain HTTP when `tls` is
/// absent. Returns once Ctrl-C has drained the open connections.
pub async fn serve(app: Router, addr: SocketAddr, tls: Option<&TlsConf>) -> Result<()> {
    match tls {
        Some(tls) => {
            // ring provider; Err only means one is already installed
            let _ = rustls::crypto::ring::default_provider().install_default();

            let rustls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key)
                .await
                .with_context(|| {
                    format!(
                        "Failed to load TLS cert {} / key {}",
                        tls.cert.display(),
                        tls.key.display()
                    )
                })?;

            let handle = Handle::new();
            tokio::spawn(shutdown_on_ctrl_c(handle.clone()));

            info!("Secure server running on https://{addr}");
            axum_server::bind_rustls(addr, rustls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .context("HTTPS server failed")?;
        }
        None => {
            warn!("no TLS configured, serving plain HTTP on http://{addr}");
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {addr}"))?;
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await
                .context("HTTP server failed")?;
        }
    }
    info!("server stopped");
    Ok(())
}

async fn shutdown_on_ctrl_c(handle: Handle) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested, draining connections");
        handle.graceful_shutdown(Some(Duration::from_secs(10)));
    }
}
