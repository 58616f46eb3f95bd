//! HTTP front end: accepts WebSocket upgrades on `/ws` and hands each
//! connection to the hub.

use std::net::SocketAddr;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;

use crate::connection;
use crate::hub::{self, EVENT_QUEUE_CAPACITY, HubHandle};

/// Starts the hub and its WebSocket listener on `addr`.
///
/// Returns the bound address and a join handle for the server task.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let (handle, hub) = hub::channel(EVENT_QUEUE_CAPACITY);
    let hub_task = tokio::spawn(hub.run());

    let app = axum::Router::new()
        .route("/ws", axum::routing::get(ws_handler))
        .with_state(handle);

    let server = tokio::spawn(async move {
        let result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "relay hub server error");
        }
        hub_task.abort();
    });

    Ok((bound_addr, server))
}

/// Starts the hub in-process for testing on an OS-assigned port.
#[cfg(test)]
pub async fn start_test_server() -> (std::net::SocketAddr, tokio::task::JoinHandle<()>) {
    start_server("127.0.0.1:0")
        .await
        .expect("failed to start test server")
}

/// axum handler that upgrades an HTTP request to a WebSocket connection.
async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    State(hub): State<HubHandle>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::serve_connection(socket, remote.to_string(), hub))
}
