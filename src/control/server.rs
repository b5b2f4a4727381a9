use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, ControlError, HttpError};
use crate::run::{RunController, RunPhase, StatusView};
use crate::shutdown::ShutdownReceiver;

use super::http::{HttpRequest, read_http_request, write_error_response, write_json_response};
use super::types::{ControlReply, ControlResponse, StartRequest};

/// Binds the control listener.
///
/// # Errors
///
/// Returns an error when the address cannot be bound.
pub async fn bind_control_listener(addr: SocketAddr) -> AppResult<TcpListener> {
    TcpListener::bind(addr).await.map_err(|err| {
        AppError::http(HttpError::BindControlListener {
            addr: addr.to_string(),
            source: err,
        })
    })
}

/// Accepts control connections until shutdown is broadcast, then stops any
/// run still in progress.
pub async fn serve_control(
    listener: TcpListener,
    controller: RunController,
    auth_token: Option<String>,
    mut shutdown_rx: ShutdownReceiver,
) {
    if let Ok(addr) = listener.local_addr() {
        info!("Control API listening on http://{}", addr);
    }
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (mut socket, peer) = match accepted {
                    Ok(result) => result,
                    Err(err) => {
                        warn!("Failed to accept control connection: {}", err);
                        continue;
                    }
                };
                let controller = controller.clone();
                let auth_token = auth_token.clone();
                tokio::spawn(async move {
                    debug!("Control connection from {}", peer);
                    handle_control_connection(&mut socket, &controller, auth_token.as_deref())
                        .await;
                });
            }
        }
    }

    if controller.phase() == RunPhase::Running
        && let Ok(ack) = controller.stop().await
    {
        info!("Stopped run {} on shutdown", ack.run_id);
    }
}

/// Reads one request, routes it and writes the response.
pub async fn handle_control_connection<S>(
    socket: &mut S,
    controller: &RunController,
    auth_token: Option<&str>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let result = match read_http_request(socket).await {
        Ok(request) => match authorize(&request, auth_token) {
            Ok(()) => route(&request, controller).await,
            Err(err) => Err(err),
        },
        Err(err) => Err(err),
    };

    let written = match result {
        Ok(reply) => write_json_response(socket, 200, &reply).await,
        Err(err) => write_error_response(socket, err.status, &err.message).await,
    };
    if let Err(err) = written {
        warn!("Failed to write control response: {}", err);
    }
}

fn authorize(request: &HttpRequest, auth_token: Option<&str>) -> Result<(), ControlError> {
    let Some(token) = auth_token else {
        return Ok(());
    };
    let expected = format!("Bearer {}", token);
    if request.header("authorization") == Some(expected.as_str()) {
        Ok(())
    } else {
        Err(ControlError::new(401, "Unauthorized"))
    }
}

/// Dispatches `POST /start`, `POST /stop` and `GET /status`.
///
/// # Errors
///
/// Returns the status and message to send back for rejected requests:
/// 400 for an invalid start body or config, 409 for a start while a run is
/// active or a stop with nothing running.
pub async fn route(
    request: &HttpRequest,
    controller: &RunController,
) -> Result<ControlReply, ControlError> {
    match (request.method.as_str(), request.path.as_str()) {
        ("POST", "/start") => {
            let content_type = request.content_type();
            let config = StartRequest::from_body(content_type.as_deref(), &request.body)?
                .into_config()?;
            let ack = controller.start(config).await?;
            Ok(ControlReply::Ack(ControlResponse {
                status: "started",
                run_id: ack.run_id,
            }))
        }
        ("POST", "/stop") => {
            let ack = controller.stop().await?;
            Ok(ControlReply::Ack(ControlResponse {
                status: "stopped",
                run_id: ack.run_id,
            }))
        }
        ("GET", "/status") => Ok(ControlReply::Status(StatusView::new(&controller.status()))),
        (_, "/start" | "/stop" | "/status") => Err(ControlError::new(405, "Method not allowed")),
        _ => Err(ControlError::new(404, "Not found")),
    }
}
