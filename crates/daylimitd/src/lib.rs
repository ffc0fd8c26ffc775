//! daylimitd request handling
//!
//! The binary reads one JSON `Request` per line and writes one `Response`
//! per line. Everything between the two lives here so it can be driven
//! without a process.

use chrono::{DateTime, Utc};
use daylimit_api::{
    Command, ErrorCode, ErrorInfo, Request, Response, ResponsePayload, API_VERSION,
};
use daylimit_core::{CoreEngine, CoreError};
use tracing::{debug, warn};

/// Handle one raw protocol line. Returns `None` for blank lines.
pub fn handle_line(engine: &mut CoreEngine, line: &str, now: DateTime<Utc>) -> Option<Response> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let response = match serde_json::from_str::<Request>(line) {
        Ok(request) => handle_request(engine, request, now),
        Err(e) => {
            warn!(error = %e, "Invalid request");
            Response::error(
                0,
                ErrorInfo::new(ErrorCode::InvalidRequest, format!("Invalid request: {}", e)),
            )
        }
    };

    Some(response)
}

/// Handle one decoded request to completion
pub fn handle_request(engine: &mut CoreEngine, request: Request, now: DateTime<Utc>) -> Response {
    let request_id = request.request_id;

    if request.api_version != API_VERSION {
        warn!(
            request_id,
            api_version = request.api_version,
            "Unsupported API version"
        );
        return Response::error(
            request_id,
            ErrorInfo::new(
                ErrorCode::UnsupportedVersion,
                format!(
                    "API version {} not supported, expected {}",
                    request.api_version, API_VERSION
                ),
            ),
        );
    }

    match request.command {
        Command::Event { event } => match engine.handle_event(&event, now) {
            Ok(effects) => {
                debug!(request_id, event = event.name(), effects = effects.len(), "Event handled");
                Response::success(request_id, ResponsePayload::Effects { effects })
            }
            Err(e) => {
                warn!(request_id, event = event.name(), error = %e, "Event failed");
                Response::error(request_id, error_info(&e))
            }
        },

        Command::GetStatus => {
            Response::success(request_id, ResponsePayload::Status(engine.status(now)))
        }

        Command::GetBreakRemaining => Response::success(
            request_id,
            ResponsePayload::BreakRemaining {
                message: engine.break_remaining_message(now),
            },
        ),

        Command::Ping => Response::success(request_id, ResponsePayload::Pong),
    }
}

/// Map a core error onto the protocol error it is reported as
pub fn error_info(error: &CoreError) -> ErrorInfo {
    let code = match error {
        CoreError::InvalidValue(_) => ErrorCode::InvalidValue,
        CoreError::SettingsLocked => ErrorCode::SettingsLocked,
        CoreError::BreakUnavailable => ErrorCode::InvalidRequest,
        CoreError::ConfigurationLoad(_) | CoreError::Persist(_) => ErrorCode::StoreError,
    };
    ErrorInfo::new(code, error.to_string())
}
