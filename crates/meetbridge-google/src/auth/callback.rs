//! Loopback listener for the OAuth redirect.
//!
//! Binds the fixed callback port, waits for exactly one request carrying the
//! expected `state`, answers the browser and returns the authorization code.
//! The listener lives inside this struct, so it is closed on every exit path.

use std::collections::HashMap;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(10);

pub struct CallbackListener {
    listener: TcpListener,
}

impl CallbackListener {
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .map_err(|e| Error::Auth(format!("Failed to bind OAuth callback port {}: {}", port, e)))?;
        info!("OAuth callback server listening on 127.0.0.1:{}", port);
        Ok(Self { listener })
    }

    pub fn port(&self) -> Result<u16> {
        Ok(self.listener.local_addr()?.port())
    }

    /// Wait for the redirect. Requests without `code`/`error` (favicon
    /// fetches and the like) are answered with 404 and ignored. Connections
    /// are read concurrently, so an idle preconnect cannot hold up the
    /// real callback.
    pub async fn wait_for_code(self, expected_state: &str) -> Result<String> {
        let mut pending = JoinSet::new();
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (socket, peer) = accepted?;
                    debug!("OAuth callback connection from {}", peer);
                    pending.spawn(read_request(socket));
                }
                Some(read) = pending.join_next() => {
                    let Ok(Some((mut socket, target))) = read else {
                        continue;
                    };
                    if let Some(outcome) = answer(&mut socket, &target, expected_state).await? {
                        return outcome;
                    }
                }
            }
        }
    }
}

/// Answer one callback request. `None` means keep waiting.
async fn answer(
    socket: &mut TcpStream,
    target: &str,
    expected_state: &str,
) -> Result<Option<Result<String>>> {
    let query = target.split_once('?').map(|(_, q)| q).unwrap_or("");
    let params = parse_query_params(query);

    if let Some(error) = params.get("error") {
        let desc = params
            .get("error_description")
            .map(|s| s.as_str())
            .unwrap_or("Unknown error");
        let html = page(&format!("Authorization failed: {}", error));
        send_response(socket, "400 Bad Request", &html).await?;
        return Ok(Some(Err(Error::Auth(format!("{}: {}", error, desc)))));
    }

    let (Some(code), Some(state)) = (params.get("code"), params.get("state")) else {
        send_response(socket, "404 Not Found", &page("Not found")).await?;
        return Ok(None);
    };

    if state != expected_state {
        warn!("OAuth callback state mismatch");
        let html = page("Invalid state parameter. Please try again.");
        send_response(socket, "400 Bad Request", &html).await?;
        return Ok(Some(Err(Error::Auth("OAuth state mismatch".to_string()))));
    }

    send_response(
        socket,
        "200 OK",
        &page("Authentication successful! You can close this tab and return to your agent."),
    )
    .await?;
    Ok(Some(Ok(code.clone())))
}

/// Read one request, giving up on connections that stay silent.
async fn read_request(mut socket: TcpStream) -> Option<(TcpStream, String)> {
    match timeout(REQUEST_READ_TIMEOUT, read_request_target(&mut socket)).await {
        Ok(Ok(Some(target))) => Some((socket, target)),
        Ok(Ok(None)) => None,
        Ok(Err(e)) => {
            debug!("Dropping OAuth callback connection: {}", e);
            None
        }
        Err(_) => {
            debug!("OAuth callback connection sent nothing; dropping it");
            None
        }
    }
}

/// Request line target (`/path?query`), or `None` for an empty request.
async fn read_request_target(socket: &mut TcpStream) -> Result<Option<String>> {
    let mut reader = BufReader::new(socket);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    // Drain headers so closing the socket does not reset the connection.
    let mut header = String::new();
    loop {
        header.clear();
        let n = reader.read_line(&mut header).await?;
        if n == 0 || header.trim().is_empty() {
            break;
        }
    }

    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return Ok(None);
    }
    Ok(Some(parts[1].to_string()))
}

fn parse_query_params(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|part| {
            let (key, value) = part.split_once('=')?;
            let decoded = urlencoding::decode(&value.replace('+', " ")).ok()?.into_owned();
            Some((key.to_string(), decoded))
        })
        .collect()
}

async fn send_response(socket: &mut TcpStream, status: &str, html: &str) -> Result<()> {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        html.len(),
        html
    );
    socket.write_all(response.as_bytes()).await?;
    socket.flush().await?;
    Ok(())
}

fn page(message: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>Meetbridge</title></head>\
         <body style=\"font-family: sans-serif; text-align: center; margin-top: 4rem;\">\
         <h1>Meetbridge</h1><p>{}</p></body></html>",
        message
    )
}
