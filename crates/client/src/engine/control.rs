//! Control channel for external maintenance requests.
//!
//! Each request carries its own reply sender, so an acknowledgement goes
//! back to exactly the caller that asked.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shellcache_core::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::lifecycle::Lifecycle;

const QUEUE_DEPTH: usize = 16;

/// A control request, serialized as `{"action": "clearNamespace", "name": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ControlMessage {
    ClearNamespace { name: String },
}

/// Acknowledgement for one control request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ControlReply {
    pub success: bool,
}

struct Envelope {
    message: ControlMessage,
    reply: oneshot::Sender<ControlReply>,
}

/// Sending side of the control channel.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<Envelope>,
}

impl ControlHandle {
    /// Send a request and wait for its acknowledgement.
    ///
    /// # Errors
    ///
    /// `ControlChannelClosed` if the control loop has stopped.
    pub async fn send(&self, message: ControlMessage) -> Result<ControlReply, Error> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope { message, reply })
            .await
            .map_err(|_| Error::ControlChannelClosed)?;
        rx.await.map_err(|_| Error::ControlChannelClosed)
    }
}

/// Spawn the control loop. It stops once every handle is dropped.
pub fn spawn(lifecycle: Arc<Lifecycle>) -> (ControlHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
    let task = tokio::spawn(run(lifecycle, rx));
    (ControlHandle { tx }, task)
}

async fn run(lifecycle: Arc<Lifecycle>, mut rx: mpsc::Receiver<Envelope>) {
    while let Some(Envelope { message, reply }) = rx.recv().await {
        let success = match &message {
            ControlMessage::ClearNamespace { name } => match lifecycle.clear_namespace(name).await {
                Ok(_) => true,
                Err(e) => {
                    tracing::warn!(namespace = %name, error = %e, "clearNamespace failed");
                    false
                }
            },
        };

        if reply.send(ControlReply { success }).is_err() {
            tracing::debug!(?message, "control requester went away before the reply");
        }
    }
    tracing::info!("control loop stopped");
}
