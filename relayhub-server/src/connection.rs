//! Per-connection reader and writer tasks.
//!
//! Each accepted WebSocket gets one reader, which turns frames into hub
//! events, and one writer, which drains the client's outbound queue. Neither
//! touches the registry.

use std::fmt::Display;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;

use crate::client::{Client, ClientHandle};
use crate::hub::HubHandle;

/// Prefix written in front of every hub-to-client frame.
pub const SERVER_PREFIX: &[u8] = b"server: ";

/// Why a writer task stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterExit {
    /// The outbound queue was closed by the hub.
    QueueClosed,
    /// Writing to the transport failed.
    TransportFailed,
}

/// Wires an upgraded socket into the hub and runs it until it is finished.
pub async fn serve_connection(socket: WebSocket, remote_addr: String, hub: HubHandle) {
    let (ws_sender, ws_receiver) = socket.split();
    run_connection(ws_sender, ws_receiver, remote_addr, hub).await;
}

/// Runs one connection's reader and writer over an already split transport.
///
/// The client is announced to the hub before either task starts so that its
/// Connect is always processed ahead of its first message. The hub sees
/// exactly one Disconnect for the connection, whichever side stops first.
pub async fn run_connection<W, R, E>(sink: W, stream: R, remote_addr: String, hub: HubHandle)
where
    W: Sink<Message> + Unpin + Send + 'static,
    W::Error: Display + Send,
    R: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: Display + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let client = Client::new(remote_addr, tx);
    let handle = client.handle().clone();

    if hub.connect(client).await.is_err() {
        tracing::warn!(remote_addr = %handle.remote_addr(), "hub stopped, dropping connection");
        return;
    }

    let writer_handle = handle.clone();
    let mut write_task = tokio::spawn(async move { write_loop(sink, rx, &writer_handle).await });

    let reader_hub = hub.clone();
    let reader_handle = handle.clone();
    let mut read_task = tokio::spawn(async move {
        read_loop(stream, reader_handle, reader_hub).await;
    });

    tokio::select! {
        _ = &mut read_task => {
            // The reader has emitted its Disconnect; the hub closes the queue
            // and the writer finishes flushing on its own.
            let _ = write_task.await;
        }
        exit = &mut write_task => {
            read_task.abort();
            let _ = read_task.await;
            if matches!(exit, Ok(WriterExit::TransportFailed) | Err(_)) {
                let _ = hub.disconnect(handle.clone()).await;
            }
        }
    }

    tracing::debug!(
        remote_addr = %handle.remote_addr(),
        connection = %handle.connection(),
        "connection closed"
    );
}

/// Reads frames until the stream fails or closes, forwarding every non-empty
/// payload to the hub. Emits exactly one Disconnect when it stops, unless the
/// hub itself has gone away.
pub async fn read_loop<S, E>(mut stream: S, client: ClientHandle, hub: HubHandle)
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        let contents = match stream.next().await {
            Some(Ok(Message::Text(text))) => text.as_str().as_bytes().to_vec(),
            Some(Ok(Message::Binary(data))) => data.to_vec(),
            Some(Ok(Message::Close(_))) => {
                tracing::debug!(remote_addr = %client.remote_addr(), "received close frame");
                break;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                tracing::debug!(remote_addr = %client.remote_addr(), error = %e, "read failed");
                break;
            }
            None => break,
        };

        if contents.is_empty() {
            continue;
        }
        if hub.message(contents, client.clone()).await.is_err() {
            return;
        }
    }

    let _ = hub.disconnect(client).await;
}

/// Drains the outbound queue into `sink`, one `server: `-prefixed frame per
/// payload, until the hub closes the queue or a write fails.
pub async fn write_loop<S>(
    mut sink: S,
    mut outbound: mpsc::UnboundedReceiver<Vec<u8>>,
    client: &ClientHandle,
) -> WriterExit
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    while let Some(payload) = outbound.recv().await {
        if let Err(e) = sink.send(outbound_frame(&payload)).await {
            tracing::warn!(remote_addr = %client.remote_addr(), error = %e, "WebSocket write failed");
            return WriterExit::TransportFailed;
        }
    }

    let _ = sink.send(Message::Close(None)).await;
    let _ = sink.close().await;
    WriterExit::QueueClosed
}

/// Builds the WebSocket frame for an outbound payload.
///
/// Text when the prefixed payload is valid UTF-8, binary otherwise.
fn outbound_frame(payload: &[u8]) -> Message {
    let frame = [SERVER_PREFIX, payload].concat();
    match String::from_utf8(frame) {
        Ok(text) => Message::Text(text.into()),
        Err(e) => Message::Binary(e.into_bytes().into()),
    }
}
