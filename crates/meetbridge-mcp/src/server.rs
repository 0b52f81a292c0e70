//! Line-delimited JSON-RPC server loop.
//!
//! Requests are read one line at a time. `tools/call` runs on its own task
//! so slow upstream calls do not block the reader; every response goes
//! through a single writer task, one frame per line.

use std::sync::Arc;

use meetbridge_protocol::{
    JsonRpcRequest, JsonRpcResponse, LineReader, LineWriter, ToolCallResult, ToolsCallRequest,
};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::dispatcher::Dispatcher;
use crate::initialize::{handle_initialize, InitializeRequest};
use crate::tools::ToolRegistry;

pub struct Server {
    registry: ToolRegistry,
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    pub fn new(registry: ToolRegistry, dispatcher: Dispatcher) -> Self {
        Self {
            registry,
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Serve until the reader reaches end of input, then wait for in-flight
    /// tool calls to finish writing their responses.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
        let writer_task = tokio::spawn(async move {
            let mut out = LineWriter::new(writer);
            while let Some(response) = rx.recv().await {
                out.send(&response).await?;
            }
            Ok::<_, meetbridge_protocol::TransportError>(())
        });

        let mut lines = LineReader::new(reader);
        let mut calls = JoinSet::new();

        while let Some(line) = lines.next_line().await? {
            while let Some(finished) = calls.try_join_next() {
                log_task_outcome(finished);
            }

            let request = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(request) => request,
                Err(e) => {
                    warn!("Unparseable frame: {}", e);
                    send(&tx, JsonRpcResponse::parse_error(format!("parse error: {}", e)));
                    continue;
                }
            };

            let Some(id) = request.id.clone() else {
                debug!("Notification: {}", request.method);
                continue;
            };

            if request.method != "tools/call" {
                send(&tx, self.handle_sync(id, request));
                continue;
            }

            match parse_call(request.params) {
                Ok(call) => {
                    let dispatcher = self.dispatcher.clone();
                    let tx = tx.clone();
                    calls.spawn(async move {
                        send(&tx, run_tool_call(dispatcher, id, call).await);
                    });
                }
                Err(e) => send(
                    &tx,
                    JsonRpcResponse::invalid_params(id, format!("invalid tools/call params: {}", e)),
                ),
            }
        }

        info!("Input closed; waiting for {} in-flight call(s)", calls.len());
        while let Some(finished) = calls.join_next().await {
            log_task_outcome(finished);
        }
        drop(tx);
        writer_task.await??;
        Ok(())
    }

    fn handle_sync(&self, id: Value, request: JsonRpcRequest) -> JsonRpcResponse {
        let JsonRpcRequest { method, params, .. } = request;
        match method.as_str() {
            "initialize" => {
                let params = if params.is_null() {
                    Ok(InitializeRequest::default())
                } else {
                    serde_json::from_value::<InitializeRequest>(params)
                };
                match params {
                    Ok(init) => to_response(id, &handle_initialize(init)),
                    Err(e) => JsonRpcResponse::invalid_params(id, format!("invalid initialize params: {}", e)),
                }
            }
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => to_response(id, &self.registry.list_response()),
            other => JsonRpcResponse::method_not_found(id, other),
        }
    }
}

fn parse_call(params: Value) -> Result<ToolsCallRequest, serde_json::Error> {
    serde_json::from_value(params)
}

/// Run one call on its own task so a panic in a handler still produces a
/// response. Anything that is not already an envelope becomes
/// `Error: <message>`.
async fn run_tool_call(dispatcher: Arc<Dispatcher>, id: Value, call: ToolsCallRequest) -> JsonRpcResponse {
    let name = call.name.clone();
    let outcome =
        tokio::spawn(async move { dispatcher.call(&call.name, &call.arguments).await }).await;

    let result = match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            error!("Tool {} failed: {}", name, e);
            ToolCallResult::error(format!("Error: {}", e))
        }
        Err(e) => {
            error!("Tool {} aborted: {}", name, e);
            ToolCallResult::error(format!("Error: tool task failed: {}", e))
        }
    };
    to_response(id, &result)
}

fn to_response<T: serde::Serialize>(id: Value, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::internal_error(id, format!("failed to encode result: {}", e)),
    }
}

fn send(tx: &mpsc::UnboundedSender<JsonRpcResponse>, response: JsonRpcResponse) {
    if tx.send(response).is_err() {
        warn!("Writer closed; dropping response");
    }
}

fn log_task_outcome(outcome: Result<(), tokio::task::JoinError>) {
    if let Err(e) = outcome {
        error!("Tool call task ended abnormally: {}", e);
    }
}
