//! Shared test utilities for loader integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;

use ::common::gateway::GatewayRegistry;
use ::common::loader::{FetchError, Fetcher};

pub const GLTF: &[u8] = br#"{"asset":{"version":"2.0"},"scenes":[{"nodes":[]}]}"#;

/// Scripted outcome for one URL
#[derive(Clone)]
pub enum Reply {
    Body(Bytes),
    Fail(FetchError),
    /// Never completes
    Hang,
    /// Completes with the body once the gate is notified
    Gated(Arc<Notify>, Bytes),
}

/// In-memory [`Fetcher`] answering from a script and recording every call.
///  Unscripted URLs answer with HTTP 404.
#[derive(Default)]
pub struct ScriptedFetcher {
    replies: Mutex<HashMap<String, Reply>>,
    probes: Mutex<HashMap<String, FetchError>>,
    calls: Mutex<Vec<String>>,
    probe_calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, url: &str, reply: Reply) {
        self.replies.lock().insert(url.to_string(), reply);
    }

    pub fn fail_probe(&self, url: &str, error: FetchError) {
        self.probes.lock().insert(url.to_string(), error);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn probe_calls(&self) -> Vec<String> {
        self.probe_calls.lock().clone()
    }
}

#[async_trait::async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        self.calls.lock().push(url.to_string());
        let reply = self.replies.lock().get(url).cloned();
        match reply {
            Some(Reply::Body(body)) => Ok(body),
            Some(Reply::Fail(error)) => Err(error),
            Some(Reply::Hang) => std::future::pending().await,
            Some(Reply::Gated(gate, body)) => {
                gate.notified().await;
                Ok(body)
            }
            None => Err(FetchError::Status(404)),
        }
    }

    async fn probe(&self, url: &str) -> Result<(), FetchError> {
        self.probe_calls.lock().push(url.to_string());
        match self.probes.lock().get(url) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

/// Registry of `count` gateways named `https://gw1/ipfs/` ...
pub fn registry(count: usize) -> Arc<GatewayRegistry> {
    Arc::new(
        GatewayRegistry::new((1..=count).map(|i| format!("https://gw{}/ipfs/", i))).unwrap(),
    )
}

pub fn png() -> Bytes {
    let mut out = Vec::new();
    image::RgbaImage::new(2, 2)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    Bytes::from(out)
}

pub fn network_error() -> FetchError {
    FetchError::Transport("connection refused".to_string())
}

/// Route loader logs to the test writer; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
