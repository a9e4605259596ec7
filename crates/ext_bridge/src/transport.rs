//! Request/reply transport shared by both sides of the bridge

use crate::error::BridgeError;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

// ============================================================================
// Message Types
// ============================================================================

/// Which process an endpoint belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Privileged,
    Sandboxed,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Privileged => write!(f, "privileged"),
            Side::Sandboxed => write!(f, "sandboxed"),
        }
    }
}

/// One call travelling to the other side, with its own reply slot
pub struct Request {
    pub channel: String,
    pub args: Vec<Value>,
    reply: oneshot::Sender<Result<Value, BridgeError>>,
}

impl Request {
    pub fn new(
        channel: impl Into<String>,
        args: Vec<Value>,
    ) -> (Self, oneshot::Receiver<Result<Value, BridgeError>>) {
        let (reply, rx) = oneshot::channel();
        let request = Self {
            channel: channel.into(),
            args,
            reply,
        };
        (request, rx)
    }

    /// Settle the reply slot. A caller that went away is not an error.
    pub fn settle(self, result: Result<Value, BridgeError>) {
        if self.reply.send(result).is_err() {
            tracing::trace!(channel = %self.channel, "Caller dropped before reply");
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("channel", &self.channel)
            .field("args", &self.args)
            .finish()
    }
}

/// One direction pair of queues as seen from a single endpoint
pub struct Link {
    pub outbound: mpsc::Sender<Request>,
    pub inbound: mpsc::Receiver<Request>,
}

/// Create the two crossed links connecting a privileged and a sandboxed endpoint
pub fn link_pair(capacity: usize) -> (Link, Link) {
    let (to_sandbox_tx, to_sandbox_rx) = mpsc::channel(capacity);
    let (to_privileged_tx, to_privileged_rx) = mpsc::channel(capacity);
    (
        Link {
            outbound: to_sandbox_tx,
            inbound: to_privileged_rx,
        },
        Link {
            outbound: to_privileged_tx,
            inbound: to_sandbox_rx,
        },
    )
}

// ============================================================================
// Handlers
// ============================================================================

pub type BlockingFn = dyn Fn(Vec<Value>) -> Result<Value, BridgeError> + Send + Sync;
pub type NonBlockingFn = dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, BridgeError>> + Send + Sync;

/// A channel listener
#[derive(Clone)]
pub enum Handler {
    /// Computes the reply before the endpoint reads its next request
    Blocking(Arc<BlockingFn>),
    /// Replies whenever its future settles
    NonBlocking(Arc<NonBlockingFn>),
}

impl Handler {
    pub fn blocking<F>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, BridgeError> + Send + Sync + 'static,
    {
        Handler::Blocking(Arc::new(f))
    }

    pub fn non_blocking<F, Fut>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BridgeError>> + Send + 'static,
    {
        Handler::NonBlocking(Arc::new(move |args| Box::pin(f(args))))
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, Handler::Blocking(_))
    }

    /// Run the handler in place, awaiting it if it is non-blocking
    pub async fn call(&self, args: Vec<Value>) -> Result<Value, BridgeError> {
        match self {
            Handler::Blocking(f) => f(args),
            Handler::NonBlocking(f) => f(args).await,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Blocking(_) => write!(f, "Handler::Blocking"),
            Handler::NonBlocking(_) => write!(f, "Handler::NonBlocking"),
        }
    }
}

// ============================================================================
// Endpoint
// ============================================================================

/// One side of the bridge: its listeners plus the queue to the other side
pub struct Endpoint {
    side: Side,
    handlers: RwLock<IndexMap<String, Handler>>,
    outbound: mpsc::Sender<Request>,
}

impl Endpoint {
    pub fn new(side: Side, outbound: mpsc::Sender<Request>) -> Arc<Self> {
        Arc::new(Self {
            side,
            handlers: RwLock::new(IndexMap::new()),
            outbound,
        })
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Listen on `channel`. Returns `false` and keeps the existing listener
    /// when one is already registered.
    pub fn handle(&self, channel: impl Into<String>, handler: Handler) -> bool {
        let channel = channel.into();
        let mut handlers = self.handlers.write();
        if handlers.contains_key(&channel) {
            tracing::info!(
                side = %self.side,
                channel = %channel,
                "Handler already registered, skipping"
            );
            return false;
        }
        tracing::debug!(side = %self.side, channel = %channel, "Registered handler");
        handlers.insert(channel, handler);
        true
    }

    pub fn has_listener(&self, channel: &str) -> bool {
        self.handlers.read().contains_key(channel)
    }

    pub fn channels(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }

    pub fn listener(&self, channel: &str) -> Option<Handler> {
        self.handlers.read().get(channel).cloned()
    }

    /// Call a channel on the other side and wait for its reply
    pub async fn request(&self, channel: &str, args: Vec<Value>) -> Result<Value, BridgeError> {
        let (request, reply) = Request::new(channel, args);
        tracing::debug!(side = %self.side, channel = %channel, "Sending request");
        self.outbound
            .send(request)
            .await
            .map_err(|e| BridgeError::channel_send(e.to_string()))?;
        reply
            .await
            .map_err(|e| BridgeError::channel_recv(e.to_string()))?
    }

    /// Blocking form of [`Endpoint::request`]. Parks the calling thread, so
    /// it must not be used from inside an async task.
    pub fn request_blocking(&self, channel: &str, args: Vec<Value>) -> Result<Value, BridgeError> {
        let (request, reply) = Request::new(channel, args);
        tracing::debug!(side = %self.side, channel = %channel, "Sending blocking request");
        self.outbound
            .blocking_send(request)
            .map_err(|e| BridgeError::channel_send(e.to_string()))?;
        reply
            .blocking_recv()
            .map_err(|e| BridgeError::channel_recv(e.to_string()))?
    }

    /// Route one inbound request to its listener
    pub fn dispatch(&self, mut request: Request) {
        let Some(handler) = self.listener(&request.channel) else {
            tracing::warn!(side = %self.side, channel = %request.channel, "No listener for request");
            let channel = request.channel.clone();
            request.settle(Err(BridgeError::no_listener(channel)));
            return;
        };

        let args = std::mem::take(&mut request.args);
        match handler {
            Handler::Blocking(f) => {
                let result = f(args);
                request.settle(result);
            }
            Handler::NonBlocking(f) => match Handle::try_current() {
                Ok(runtime) => {
                    let future = f(args);
                    runtime.spawn(async move {
                        let result = future.await;
                        request.settle(result);
                    });
                }
                Err(e) => request.settle(Err(e.into())),
            },
        }
    }

    /// Serve inbound requests until the other side hangs up
    pub async fn serve(self: Arc<Self>, mut inbound: mpsc::Receiver<Request>) {
        tracing::debug!(side = %self.side, "Endpoint serving");
        while let Some(request) = inbound.recv().await {
            self.dispatch(request);
        }
        tracing::debug!(side = %self.side, "Endpoint closed");
    }

    /// Spawn [`Endpoint::serve`] on the current runtime
    pub fn spawn(
        self: &Arc<Self>,
        inbound: mpsc::Receiver<Request>,
    ) -> Result<JoinHandle<()>, BridgeError> {
        let runtime = Handle::try_current()?;
        Ok(runtime.spawn(Arc::clone(self).serve(inbound)))
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("side", &self.side)
            .field("channels", &self.channels())
            .finish()
    }
}
