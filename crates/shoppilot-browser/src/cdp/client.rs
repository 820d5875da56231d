//! CDP WebSocket client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};

use super::error::CdpError;
use super::protocol::{BrowserVersion, CdpRequest, CdpResponse, PageInfo};
use super::session::PageSession;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Pending request waiting for response.
pub(crate) struct PendingRequest {
    pub tx: oneshot::Sender<Result<Value, CdpError>>,
}

/// CDP client connected to one browser instance.
///
/// Commands are multiplexed over a single browser-level WebSocket; page
/// sessions share the sink and the pending-request map.
pub struct CdpClient {
    /// HTTP endpoint for page discovery.
    http_endpoint: String,
    /// WebSocket sender.
    ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
    /// Request ID counter.
    request_id: Arc<AtomicU64>,
    /// Pending requests waiting for responses.
    pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
    /// Background task handle.
    _recv_task: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to Chrome at the given debugging endpoint
    /// (e.g. "http://localhost:9222").
    pub async fn connect(endpoint: &str) -> Result<Self, CdpError> {
        let http_endpoint = endpoint.trim_end_matches('/').to_string();

        // Browser version info carries the WebSocket URL.
        let version_url = format!("{}/json/version", http_endpoint);
        debug!("Fetching browser version from {}", version_url);

        let version: BrowserVersion = reqwest::get(&version_url)
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?
            .json()
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?;

        debug!("Connected to browser: {}", version.browser);

        let (ws_stream, _) = tokio_tungstenite::connect_async(&version.web_socket_debugger_url)
            .await
            .map_err(|e| CdpError::ConnectionFailed(format!("WebSocket: {}", e)))?;

        let (ws_sink, ws_source) = ws_stream.split();
        let ws_tx = Arc::new(tokio::sync::Mutex::new(ws_sink));
        let pending: Arc<Mutex<HashMap<u64, PendingRequest>>> = Arc::new(Mutex::new(HashMap::new()));

        let recv_task = {
            let pending = pending.clone();
            tokio::spawn(async move {
                Self::receive_loop(ws_source, pending).await;
            })
        };

        debug!("CDP client connected to {}", version.web_socket_debugger_url);

        Ok(Self {
            http_endpoint,
            ws_tx,
            request_id: Arc::new(AtomicU64::new(1)),
            pending,
            _recv_task: recv_task,
        })
    }

    /// WebSocket receive loop. Resolves pending requests; events are not
    /// consumed anywhere (stabilization polls the page instead), so they
    /// are traced and dropped.
    async fn receive_loop(mut ws_source: WsSource, pending: Arc<Mutex<HashMap<u64, PendingRequest>>>) {
        while let Some(msg) = ws_source.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    trace!("CDP recv: {}", text);
                    match serde_json::from_str::<CdpResponse>(&text) {
                        Ok(resp) => {
                            if let Some(id) = resp.id {
                                let pending_req = pending.lock().remove(&id);
                                if let Some(req) = pending_req {
                                    let result = if let Some(error) = resp.error {
                                        Err(CdpError::Protocol {
                                            code: error.code,
                                            message: error.message,
                                        })
                                    } else {
                                        Ok(resp.result.unwrap_or(Value::Null))
                                    };
                                    let _ = req.tx.send(result);
                                }
                            } else if let Some(method) = resp.method {
                                trace!("CDP event dropped: {}", method);
                            }
                        }
                        Err(e) => {
                            warn!("Failed to parse CDP message: {}", e);
                        }
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("WebSocket closed");
                    break;
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    }

    /// Send a browser-level CDP command and wait for the response.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: None,
        };

        let json = serde_json::to_string(&request)?;
        trace!("CDP send: {}", json);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, PendingRequest { tx });

        {
            let mut ws = self.ws_tx.lock().await;
            ws.send(Message::Text(json.into())).await?;
        }

        match tokio::time::timeout(std::time::Duration::from_secs(30), rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout(format!("Request {} timed out", method)))
            }
        }
    }

    /// Create a new page/tab and attach to it.
    pub async fn new_page(&self, url: Option<&str>) -> Result<PageSession, CdpError> {
        // Chrome requires PUT for /json/new.
        let create_url = if let Some(u) = url {
            format!("{}/json/new?{}", self.http_endpoint, u)
        } else {
            format!("{}/json/new", self.http_endpoint)
        };

        let client = reqwest::Client::new();
        let page_info: PageInfo = client.put(&create_url).send().await?.json().await?;
        debug!("Created new page: {} - {}", page_info.id, page_info.url);

        let result = self
            .call(
                "Target.attachToTarget",
                Some(json!({
                    "targetId": page_info.id,
                    "flatten": true
                })),
            )
            .await?;

        let session_id = result["sessionId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing sessionId".to_string()))?
            .to_string();

        let session = PageSession::new(
            page_info.id.clone(),
            session_id,
            self.ws_tx.clone(),
            self.pending.clone(),
            self.request_id.clone(),
        );

        session.enable_domains().await?;

        Ok(session)
    }

    /// Close a page/target.
    pub async fn close_page(&self, target_id: &str) -> Result<(), CdpError> {
        self.call("Target.closeTarget", Some(json!({"targetId": target_id})))
            .await?;
        Ok(())
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self._recv_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_increment() {
        let id = AtomicU64::new(1);
        assert_eq!(id.fetch_add(1, Ordering::SeqCst), 1);
        assert_eq!(id.fetch_add(1, Ordering::SeqCst), 2);
        assert_eq!(id.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_pending_map_resolution_order() {
        let pending: Mutex<HashMap<u64, PendingRequest>> = Mutex::new(HashMap::new());
        let (tx, mut rx) = oneshot::channel();
        pending.lock().insert(5, PendingRequest { tx });

        let req = pending.lock().remove(&5).unwrap();
        let _ = req.tx.send(Ok(Value::Null));
        assert!(matches!(rx.try_recv(), Ok(Ok(Value::Null))));
        assert!(pending.lock().is_empty());
    }
}
