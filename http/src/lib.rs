//! Exposition endpoint for the tirex metric set.

pub mod error;
pub mod router;

use axum::{
    serve,
    Router,
};
use eyre::{
    Context as _,
    Result,
};
use std::{
    future::Future,
    net::SocketAddr,
};
use tokio::net::TcpListener;

pub use router::create_router;

pub async fn bind(address: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(address)
        .await
        .wrap_err_with(|| format!("Failed to listen on {address}"))
}

/// Serves `router` until `shutdown` resolves.
pub async fn start_server<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!("listening on {}", listener.local_addr()?);
    serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
