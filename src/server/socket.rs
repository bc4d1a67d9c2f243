use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{error::FocusError, service::FocusService};

use super::{blocking, routes::ConfigureRequest};

/// Inbound control messages, e.g. `{"action": "get_history", "n": 3}`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ControlRequest {
    Start,
    Stop,
    GetState,
    GetHistory {
        #[serde(default)]
        n: Option<usize>,
    },
    Configure(ConfigureRequest),
}

impl ControlRequest {
    fn name(&self) -> &'static str {
        match self {
            ControlRequest::Start => "start",
            ControlRequest::Stop => "stop",
            ControlRequest::GetState => "get_state",
            ControlRequest::GetHistory { .. } => "get_history",
            ControlRequest::Configure(_) => "configure",
        }
    }
}

pub async fn upgrade(ws: WebSocketUpgrade, State(service): State<FocusService>) -> Response {
    ws.on_upgrade(move |socket| run_socket(socket, service))
}

/// Becomes the bridge consumer for as long as the socket lives. A newer
/// socket takes over; this one then ends once its buffer drains.
async fn run_socket(mut socket: WebSocket, service: FocusService) {
    let mut subscription = service.bridge().attach();
    let id = subscription.id();
    info!("websocket consumer {id} connected");

    loop {
        tokio::select! {
            outbound = subscription.recv() => {
                let Some(message) = outbound else {
                    info!("websocket consumer {id} replaced");
                    break;
                };
                let text = match message.to_json() {
                    Ok(text) => text,
                    Err(err) => {
                        warn!("failed to encode outbound message: {err}");
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    debug!("websocket consumer {id} send failed");
                    break;
                }
            }
            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    let reply = handle_control(&service, &text).await;
                    if socket.send(Message::Text(reply.to_string())).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!("websocket consumer {id} receive failed: {err}");
                    break;
                }
            },
        }
    }

    // Dropping the subscription detaches it unless a newer socket took over.
    drop(subscription);
    info!("websocket consumer {id} disconnected");
}

pub(crate) async fn handle_control(service: &FocusService, text: &str) -> Value {
    let request: ControlRequest = match serde_json::from_str(text) {
        Ok(request) => request,
        Err(err) => {
            return json!({ "type": "REPLY", "ok": false, "error": format!("bad request: {err}") });
        }
    };

    let action = request.name();
    match dispatch(service, request).await {
        Ok(data) => json!({ "type": "REPLY", "action": action, "ok": true, "data": data }),
        Err(err) => json!({ "type": "REPLY", "action": action, "ok": false, "error": err.to_string() }),
    }
}

async fn dispatch(service: &FocusService, request: ControlRequest) -> Result<Value, FocusError> {
    let data = match request {
        ControlRequest::Start => {
            let service = service.clone();
            let outcome = blocking(move || service.start()).await??;
            serde_json::to_value(outcome)
        }
        ControlRequest::Stop => {
            let service = service.clone();
            let outcome = blocking(move || service.stop()).await?;
            serde_json::to_value(outcome)
        }
        ControlRequest::GetState => serde_json::to_value(service.get_state()),
        ControlRequest::GetHistory { n } => {
            let n = n.unwrap_or_else(|| service.history().capacity());
            serde_json::to_value(service.get_history(n).await?)
        }
        ControlRequest::Configure(request) => serde_json::to_value(service.configure(
            request.focus_total,
            request.rest_duration,
            request.check_interval,
        )?),
    };
    data.map_err(|err| FocusError::Internal(format!("failed to encode reply: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_control_actions() {
        let request: ControlRequest =
            serde_json::from_str(r#"{"action": "get_history", "n": 2}"#).unwrap();
        assert!(matches!(request, ControlRequest::GetHistory { n: Some(2) }));

        let request: ControlRequest = serde_json::from_str(
            r#"{"action": "configure", "focusTotal": 120, "rest_duration": 10}"#,
        )
        .unwrap();
        match request {
            ControlRequest::Configure(config) => {
                assert_eq!(config.focus_total, 120);
                assert_eq!(config.rest_duration, 10);
                assert_eq!(config.check_interval, 0);
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(serde_json::from_str::<ControlRequest>(r#"{"action": "dance"}"#).is_err());
    }
}
