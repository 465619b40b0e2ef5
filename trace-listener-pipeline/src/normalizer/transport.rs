use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use trace_listener_shared::types::TraceEvent;

use crate::errors::TransportError;
use crate::subscription::TraceQuery;

/// Messages delivered by the transport collaborator.
#[derive(Clone, Debug)]
pub enum StreamMessage {
    /// One raw trace matched by the subscription's filter query.
    Trace(TraceEvent),
    /// A terminal transport failure; forwarded to the consumer verbatim.
    Error(TransportError),
    /// The upstream stream completed.
    End,
}

/// Trait for the wire transport that delivers trace events.
///
/// Implementations own connection management, reconnection and backoff;
/// the normalizer never retries. The transport sends messages until the
/// stream ends, the channel closes, or the shutdown signal fires.
#[async_trait]
pub trait StreamTraces: Send + Sync {
    async fn stream_traces(
        &self,
        query: &TraceQuery,
        sender: mpsc::Sender<StreamMessage>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), TransportError>;
}
