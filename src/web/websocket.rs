//! WebSocket handler streaming distance readings.

use crate::sensor::SensorReading;
use crate::web::state::{AppState, SessionSlot};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::{future, Sink, SinkExt, StreamExt};
use std::fmt::Debug;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, error, info, warn};

/// WebSocket upgrade handler for `/sensor`.
pub async fn sensor_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let Some(slot) = state.sessions.try_acquire() else {
        warn!("Refusing sensor stream: connection limit reached");
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many sensor streams").into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, slot))
}

/// Handle one WebSocket connection until the client leaves or the server stops.
async fn handle_socket(socket: WebSocket, state: AppState, _slot: SessionSlot) {
    let client_id = uuid::Uuid::new_v4().to_string();
    info!("Sensor client connected: {}", client_id);

    let (sender, mut receiver) = socket.split();
    let readings = state.feed.subscribe();

    let send_client_id = client_id.clone();
    let mut send_task = tokio::spawn(async move {
        let sink = sender.with(|json: String| future::ready(Ok::<_, axum::Error>(Message::Text(json))));
        let sent = stream_readings(readings, sink).await;
        debug!("Sent {} readings to {}", sent, send_client_id);
    });

    // Only used to notice the client closing between readings.
    let recv_client_id = client_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Ok(_) => debug!("Ignoring message from {}", recv_client_id),
                Err(e) => {
                    warn!("WebSocket error for client {}: {}", recv_client_id, e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
        _ = state.shutdown.cancelled() => {
            send_task.abort();
            recv_task.abort();
        }
    }

    info!("Sensor client disconnected: {}", client_id);
}

/// Push every reading from `readings` into `sink` as JSON text.
///
/// Returns the number of readings delivered. Ends when a write fails (the
/// client went away), when a reading cannot be serialized, or when the
/// producer is gone. A subscriber that falls behind skips the readings it
/// missed.
pub async fn stream_readings<S>(readings: broadcast::Receiver<SensorReading>, mut sink: S) -> usize
where
    S: Sink<String> + Unpin,
    S::Error: Debug,
{
    let mut readings = BroadcastStream::new(readings);
    let mut sent = 0;

    while let Some(item) = readings.next().await {
        let reading = match item {
            Ok(reading) => reading,
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                warn!("Sensor stream lagged, skipped {} readings", missed);
                continue;
            }
        };

        let json = match serde_json::to_string(&reading) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize reading: {}", e);
                break;
            }
        };

        if let Err(e) = sink.send(json).await {
            debug!("Sensor stream closed: {:?}", e);
            break;
        }
        sent += 1;
    }

    sent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::ReadingStatus;
    use tokio::sync::mpsc;
    use tokio_util::sync::PollSender;

    #[tokio::test]
    async fn test_stream_delivers_each_reading() {
        let (tx, rx) = broadcast::channel(8);
        let (client_tx, mut client_rx) = mpsc::channel::<String>(8);

        let session = tokio::spawn(stream_readings(rx, PollSender::new(client_tx)));

        tx.send(SensorReading::success(12.5)).unwrap();
        tx.send(SensorReading::error()).unwrap();
        tx.send(SensorReading::success(80.0)).unwrap();

        let mut payloads = Vec::new();
        for _ in 0..3 {
            let json = client_rx.recv().await.unwrap();
            payloads.push(serde_json::from_str::<SensorReading>(&json).unwrap());
        }
        assert_eq!(payloads[0], SensorReading::success(12.5));
        assert_eq!(payloads[1].status, ReadingStatus::Error);
        assert!(payloads.iter().all(|p| p.distance >= 0.0));

        drop(tx);
        assert_eq!(session.await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_stream_ends_when_client_closes() {
        let (tx, rx) = broadcast::channel(8);
        let (client_tx, mut client_rx) = mpsc::channel::<String>(8);

        let session = tokio::spawn(stream_readings(rx, PollSender::new(client_tx)));

        tx.send(SensorReading::success(1.0)).unwrap();
        client_rx.recv().await.unwrap();
        drop(client_rx);

        tx.send(SensorReading::success(2.0)).unwrap();
        assert_eq!(session.await.unwrap(), 1);
        assert_eq!(tx.receiver_count(), 0);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_keeps_streaming() {
        let (tx, rx) = broadcast::channel(2);
        let (client_tx, mut client_rx) = mpsc::channel::<String>(8);

        for distance in [1.0, 2.0, 3.0, 4.0] {
            tx.send(SensorReading::success(distance)).unwrap();
        }
        let session = tokio::spawn(stream_readings(rx, PollSender::new(client_tx)));

        let first: SensorReading = serde_json::from_str(&client_rx.recv().await.unwrap()).unwrap();
        assert_eq!(first.distance, 3.0);

        drop(tx);
        assert_eq!(session.await.unwrap(), 2);
    }
}
