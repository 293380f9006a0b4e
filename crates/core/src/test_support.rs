//! Local axum server for exercising the blocking HTTP clients in unit tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Notify;

/// What the stub server saw from the client.
#[derive(Debug)]
pub struct CapturedRequest {
    /// `METHOD /path?query`
    pub request_line: String,
    /// Lower-case header names.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    fn new(method: &Method, uri: &Uri, headers: &HeaderMap, body: Bytes) -> Self {
        let headers = headers
            .iter()
            .filter_map(|(name, value)| {
                Some((name.as_str().to_string(), value.to_str().ok()?.to_string()))
            })
            .collect();
        Self {
            request_line: format!("{method} {uri}"),
            headers,
            body: body.to_vec(),
        }
    }
}

/// Answers every route with one canned response, records the first request
/// and shuts down after serving it.
pub struct StubServer {
    addr: SocketAddr,
    handle: JoinHandle<CapturedRequest>,
}

impl StubServer {
    pub fn respond_once(status: u16, content_type: &str, body: &[u8]) -> Self {
        let status = StatusCode::from_u16(status).unwrap();
        let content_type = content_type.to_string();
        let body = Bytes::copy_from_slice(body);
        let (addr_tx, addr_rx) = mpsc::channel();

        let handle = std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
                addr_tx.send(listener.local_addr().unwrap()).unwrap();

                let captured: Arc<Mutex<Option<CapturedRequest>>> = Arc::new(Mutex::new(None));
                let served = Arc::new(Notify::new());

                let app = Router::new().fallback({
                    let captured = captured.clone();
                    let served = served.clone();
                    move |method: Method, uri: Uri, headers: HeaderMap, request_body: Bytes| async move {
                        captured.lock().unwrap().get_or_insert_with(|| {
                            CapturedRequest::new(&method, &uri, &headers, request_body)
                        });
                        served.notify_one();
                        (status, [(header::CONTENT_TYPE, content_type)], body)
                    }
                });

                axum::serve(listener, app)
                    .with_graceful_shutdown(async move { served.notified().await })
                    .await
                    .unwrap();

                let request = captured.lock().unwrap().take();
                request.unwrap()
            })
        });

        let addr = addr_rx.recv().unwrap();
        Self { addr, handle }
    }

    pub fn url(&self) -> String {
        format!("http://{}/score", self.addr)
    }

    /// Waits for the exchange to finish and returns the captured request.
    pub fn join(self) -> CapturedRequest {
        self.handle.join().unwrap()
    }
}
