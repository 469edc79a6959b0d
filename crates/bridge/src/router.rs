use crate::errors::BridgeError;
use crate::reply_channel::ReplyChannel;
use core_types::{Line, Transport};
use framing::LineFramer;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// The single reader of the transport.
///
/// Reads chunks, splits them into lines, decodes each as ASCII and pushes it
/// onto the reply channel's active queue. No classification happens here.
/// Blank lines are dropped.
///
/// The loop only ends on failure: a transport error or a non-ASCII byte.
/// Either way the reply channel is closed with that error as its reason,
/// which wakes every consumer.
pub struct ResponseRouter<T> {
    transport: Arc<T>,
    replies: Arc<ReplyChannel>,
    framer: LineFramer,
}

impl<T: Transport> ResponseRouter<T> {
    pub fn new(transport: Arc<T>, replies: Arc<ReplyChannel>) -> Self {
        Self {
            transport,
            replies,
            framer: LineFramer::new(),
        }
    }

    pub fn spawn(self) -> JoinHandle<BridgeError> {
        tokio::spawn(self.run())
    }

    /// Run until the transport fails. Returns the error that stopped it.
    pub async fn run(mut self) -> BridgeError {
        info!("response router started");
        let reason = self.pump().await;
        error!(error = %reason, "response router stopped");
        self.replies.close(Some(reason.clone()));
        reason
    }

    async fn pump(&mut self) -> BridgeError {
        loop {
            let chunk = match self.transport.read_chunk().await {
                Ok(chunk) => chunk,
                Err(e) => return e.into(),
            };

            for record in self.framer.push(&chunk) {
                let line = match Line::from_ascii(&record) {
                    Ok(line) => line,
                    Err(e) => return e.into(),
                };
                if line.is_empty() {
                    continue;
                }
                debug!(line = %line, "serial read");
                self.replies.push(line);
            }
        }
    }
}
