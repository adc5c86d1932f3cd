//! # Request/Response Adapter
//!
//! Turns transport requests into controller calls and reports status back.
//!
//! Requests are JSON objects tagged by `cmd`:
//!
//! | `cmd` | Fields | Operation |
//! |-------|--------|-----------|
//! | `status` | | status snapshot |
//! | `configure` | `pin?`, `protocol?` | reassign pin / switch protocol |
//! | `set_throttle` | `value` | store clamped throttle |
//! | `arm` | | arm at idle throttle |
//! | `disarm` | | disarm, pin LOW |
//! | `set_direction` | `direction` | FORWARD / REVERSE / BRAKE |
//! | `brake` | | DShot motor stop |
//!
//! Every response carries `ok`; successes include the resulting `status`,
//! failures an `error` class and `message`.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::{EscError, Result};
use crate::esc::controller::{EscController, EscStatus};
use crate::hal::{DelayNs, Gpio};
use crate::store::SettingsStore;

/// Controller shared between the control loop and request handling
pub type SharedEsc<G, D, S> = Arc<Mutex<EscController<G, D, S>>>;

/// Lock the shared controller
///
/// A poisoned lock is recovered; disarm must stay reachable after a panic
/// elsewhere.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Incoming request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Request {
    Status,
    Configure {
        #[serde(default)]
        pin: Option<i64>,
        #[serde(default)]
        protocol: Option<String>,
    },
    SetThrottle {
        value: i64,
    },
    Arm,
    Disarm,
    SetDirection {
        direction: String,
    },
    Brake,
}

/// Outgoing response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EscStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    pub fn success(status: EscStatus) -> Self {
        Self {
            ok: true,
            status: Some(status),
            error: None,
            message: None,
        }
    }

    pub fn failure(error: &EscError) -> Self {
        Self {
            ok: false,
            status: None,
            error: Some(error.kind().as_str()),
            message: Some(error.to_string()),
        }
    }
}

/// Apply a request to the controller
pub fn handle_request<G, D, S>(esc: &mut EscController<G, D, S>, request: Request) -> Response
where
    G: Gpio,
    D: DelayNs,
    S: SettingsStore,
{
    debug!("Handling {:?}", request);

    let result = match request {
        Request::Status => Ok(()),
        Request::Configure { pin, protocol } => esc.configure_raw(pin, protocol.as_deref()),
        Request::SetThrottle { value } => {
            esc.set_throttle(value);
            Ok(())
        }
        Request::Arm => {
            esc.arm();
            Ok(())
        }
        Request::Disarm => {
            esc.disarm();
            Ok(())
        }
        Request::SetDirection { direction } => esc.set_direction_named(&direction),
        Request::Brake => esc.brake(),
    };

    match result {
        Ok(()) => Response::success(esc.status()),
        Err(e) => {
            warn!("Request failed: {}", e);
            Response::failure(&e)
        }
    }
}

/// Parse one JSON request line and apply it
pub fn handle_line<G, D, S>(esc: &mut EscController<G, D, S>, line: &str) -> Response
where
    G: Gpio,
    D: DelayNs,
    S: SettingsStore,
{
    match serde_json::from_str::<Request>(line) {
        Ok(request) => handle_request(esc, request),
        Err(e) => Response::failure(&EscError::MalformedRequest(e.to_string())),
    }
}

/// Serve a JSON-lines session until the reader is exhausted
///
/// Each non-empty input line is one request; each gets exactly one
/// response line.
///
/// # Errors
///
/// Returns error if reading or writing the stream fails
pub async fn serve<R, W, G, D, S>(reader: R, mut writer: W, esc: SharedEsc<G, D, S>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    G: Gpio,
    D: DelayNs,
    S: SettingsStore,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = {
            let mut esc = lock(&esc);
            handle_line(&mut *esc, &line)
        };

        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        writer.write_all(out.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EscConfig;
    use crate::dshot::command::CommandRepeat;
    use crate::esc::protocol::{Direction, Protocol};
    use crate::hal::mocks::{RecordingDelay, RecordingGpio};
    use crate::store::MemoryStore;
    use crate::transmitter::SignalTransmitter;
    use tokio::io::BufReader;
    use tokio_test::io::Builder;

    type TestEsc = EscController<RecordingGpio, RecordingDelay, MemoryStore>;

    fn controller() -> TestEsc {
        let transmitter = SignalTransmitter::new(RecordingGpio::new(), RecordingDelay::new());
        EscController::new(
            transmitter,
            MemoryStore::new(),
            &EscConfig::default(),
            CommandRepeat::default(),
        )
    }

    #[test]
    fn test_parse_requests() {
        let request: Request = serde_json::from_str(r#"{"cmd":"configure","pin":5,"protocol":"DSHOT300"}"#).unwrap();
        assert_eq!(
            request,
            Request::Configure { pin: Some(5), protocol: Some("DSHOT300".into()) }
        );

        let request: Request = serde_json::from_str(r#"{"cmd":"configure"}"#).unwrap();
        assert_eq!(request, Request::Configure { pin: None, protocol: None });

        let request: Request = serde_json::from_str(r#"{"cmd":"set_throttle","value":-10}"#).unwrap();
        assert_eq!(request, Request::SetThrottle { value: -10 });

        let request: Request = serde_json::from_str(r#"{"cmd":"brake"}"#).unwrap();
        assert_eq!(request, Request::Brake);
    }

    #[test]
    fn test_end_to_end_sequence() {
        let mut esc = controller();
        handle_line(&mut esc, r#"{"cmd":"configure","pin":5,"protocol":"DSHOT300"}"#);
        handle_line(&mut esc, r#"{"cmd":"arm"}"#);
        handle_line(&mut esc, r#"{"cmd":"set_throttle","value":1500}"#);
        let response = handle_line(&mut esc, r#"{"cmd":"status"}"#);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "ok": true,
                "status": {
                    "pin": 5,
                    "protocol": "DSHOT300",
                    "armed": true,
                    "throttle": 1500,
                    "direction": "FORWARD",
                    "directionSupported": true
                }
            })
        );
    }

    #[test]
    fn test_validation_failure() {
        let mut esc = controller();
        let response = handle_request(
            &mut esc,
            Request::Configure { pin: Some(40), protocol: None },
        );
        assert!(!response.ok);
        assert_eq!(response.error, Some("validation"));
        assert!(response.status.is_none());
        assert_eq!(esc.status().pin, 5);
    }

    #[test]
    fn test_capability_failure() {
        let mut esc = controller();
        let response = handle_request(
            &mut esc,
            Request::SetDirection { direction: "REVERSE".into() },
        );
        assert_eq!(response.error, Some("capability"));
        assert_eq!(esc.status().direction, Direction::Forward);
    }

    #[test]
    fn test_not_armed_failure() {
        let mut esc = controller();
        esc.configure(None, Some(Protocol::DShot600));
        let response = handle_request(&mut esc, Request::Brake);
        assert_eq!(response.error, Some("not_armed"));
        assert_eq!(response.message.as_deref(), Some("ESC is not armed"));
    }

    #[test]
    fn test_malformed_line() {
        let mut esc = controller();
        for line in ["not json", r#"{"cmd":"launch"}"#, r#"{"cmd":"set_throttle"}"#] {
            let response = handle_line(&mut esc, line);
            assert!(!response.ok, "line {:?} should fail", line);
            assert_eq!(response.error, Some("validation"));
        }
    }

    #[test]
    fn test_failure_serialization_omits_status() {
        let response = Response::failure(&EscError::NotArmed);
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(
            json,
            r#"{"ok":false,"error":"not_armed","message":"ESC is not armed"}"#
        );
    }

    #[tokio::test]
    async fn test_serve_json_lines() {
        let reader = Builder::new()
            .read(b"{\"cmd\":\"arm\"}\n")
            .read(b"\n")
            .read(b"{\"cmd\":\"set_throttle\",\"value\":5000}\n{\"cmd\":\"disarm\"}\n")
            .build();
        let mut output: Vec<u8> = Vec::new();
        let esc = Arc::new(Mutex::new(controller()));

        serve(BufReader::new(reader), &mut output, esc.clone()).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let responses: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["status"]["armed"], true);
        assert_eq!(responses[0]["status"]["throttle"], 1000);
        assert_eq!(responses[1]["status"]["throttle"], 2000);
        assert_eq!(responses[2]["status"]["armed"], false);
        assert_eq!(responses[2]["status"]["throttle"], 0);

        assert!(!lock(&esc).status().armed);
    }
}
