use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info};

use trace_listener_shared::paths::short_table_path;
use trace_listener_shared::types::{ActionRecord, DbOp, DecodedDbOp, TraceEvent};

use super::output::{
    ActionOutput, DecodedDbOps, NormalizedAction, OutputEvent, TraceContext, TraceOutput,
};
use super::transport::{StreamMessage, StreamTraces};
use crate::abi::TypeCache;
use crate::errors::ListenError;
use crate::subscription::{OutputMode, StreamPosition, Subscription, SubscriptionRequest};

/// Buffer size of the trace and output channels.
const CHANNEL_BUFFER_SIZE: usize = 1000;

/// Messages delivered through a subscription handle.
///
/// At most one `Error` is delivered, and nothing follows it: an in-stream
/// error terminates the subscription.
#[derive(Debug)]
pub enum SubscriptionMessage {
    Event(OutputEvent),
    Error(ListenError),
    End,
}

/// Entry point of the pipeline: opens subscriptions against a transport
/// and a shared type cache.
///
/// Subscriptions are isolated from each other; the type cache is the only
/// shared state.
pub struct TraceListener {
    transport: Arc<dyn StreamTraces>,
    types: Arc<TypeCache>,
}

impl TraceListener {
    pub fn new(transport: Arc<dyn StreamTraces>, types: Arc<TypeCache>) -> Self {
        Self { transport, types }
    }

    /// Opens one subscription.
    ///
    /// Request validation happens synchronously, before anything is
    /// spawned. When dbOp decoding is enabled, every declared table type is
    /// warmed in the cache first so the first live event does not pay
    /// cold-fetch latency inside the delivery path.
    pub async fn open(
        &self,
        request: SubscriptionRequest,
    ) -> Result<SubscriptionHandle, ListenError> {
        let subscription = Subscription::new(request)?;

        if subscription.has_db_ops() {
            for path in subscription.declared_type_paths() {
                self.types.warm_type(&path).await;
            }
        }

        let (trace_tx, trace_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let (output_tx, output_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let (shutdown_tx, _) = broadcast::channel(1);
        let (position_tx, position_rx) = watch::channel(subscription.position().clone());

        info!(
            filter = %subscription.query().filter,
            low_block_num = subscription.query().low_block_num,
            "opening subscription"
        );

        let transport = Arc::clone(&self.transport);
        let query = subscription.query().clone();
        let transport_shutdown = shutdown_tx.subscribe();
        let transport_task = tokio::spawn(async move {
            if let Err(err) = transport
                .stream_traces(&query, trace_tx, transport_shutdown)
                .await
            {
                error!(error = %err, "transport task failed");
            }
        });

        let worker_task = tokio::spawn(run_worker(
            subscription,
            Arc::clone(&self.types),
            trace_rx,
            output_tx,
            position_tx,
            shutdown_tx.subscribe(),
        ));

        Ok(SubscriptionHandle {
            receiver: output_rx,
            position: position_rx,
            shutdown: shutdown_tx,
            transport_task,
            worker_task,
        })
    }
}

/// Handle to one open subscription: a push-based sequence of output
/// messages plus a stop switch.
pub struct SubscriptionHandle {
    receiver: mpsc::Receiver<SubscriptionMessage>,
    position: watch::Receiver<StreamPosition>,
    shutdown: broadcast::Sender<()>,
    transport_task: JoinHandle<()>,
    worker_task: JoinHandle<()>,
}

impl SubscriptionHandle {
    /// Receives the next message; `None` once the subscription has fully
    /// terminated.
    pub async fn next(&mut self) -> Option<SubscriptionMessage> {
        self.receiver.recv().await
    }

    /// The last fully-processed position, for resuming after a restart.
    pub fn position(&self) -> StreamPosition {
        self.position.borrow().clone()
    }

    /// Stops the subscription. Safe to call repeatedly and concurrently
    /// with in-flight processing; once it returns, no further messages are
    /// accepted into the channel (already-buffered ones can still be
    /// drained).
    pub fn stop(&mut self) {
        let _ = self.shutdown.send(());
        self.receiver.close();
    }

    /// Waits for the background tasks to settle after a stop or stream end.
    pub async fn join(self) {
        let _ = self.transport_task.await;
        let _ = self.worker_task.await;
    }

    /// Consumes the handle into a `Stream` of messages. The subscription
    /// then runs until the upstream ends or the stream is dropped.
    pub fn into_stream(self) -> ReceiverStream<SubscriptionMessage> {
        ReceiverStream::new(self.receiver)
    }
}

/// Processes transport messages one at a time, in delivery order.
async fn run_worker(
    mut subscription: Subscription,
    types: Arc<TypeCache>,
    mut traces: mpsc::Receiver<StreamMessage>,
    outputs: mpsc::Sender<SubscriptionMessage>,
    position: watch::Sender<StreamPosition>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                debug!("subscription worker stopped");
                break;
            }
            message = traces.recv() => match message {
                None | Some(StreamMessage::End) => {
                    let _ = outputs.send(SubscriptionMessage::End).await;
                    break;
                }
                Some(StreamMessage::Error(err)) => {
                    let _ = outputs.send(SubscriptionMessage::Error(err.into())).await;
                    break;
                }
                Some(StreamMessage::Trace(trace)) => {
                    match process_trace(&mut subscription, &types, trace).await {
                        Ok(events) => {
                            let _ = position.send(subscription.position().clone());
                            let mut receiver_gone = false;
                            for event in events {
                                if outputs
                                    .send(SubscriptionMessage::Event(event))
                                    .await
                                    .is_err()
                                {
                                    receiver_gone = true;
                                    break;
                                }
                            }
                            if receiver_gone {
                                break;
                            }
                        }
                        Err(err) => {
                            let _ = outputs.send(SubscriptionMessage::Error(err)).await;
                            break;
                        }
                    }
                }
            }
        }
    }
}

/// Maps one raw trace to zero, one, or many output events.
async fn process_trace(
    subscription: &mut Subscription,
    types: &TypeCache,
    trace: TraceEvent,
) -> Result<Vec<OutputEvent>, ListenError> {
    // Raw mode is an escape hatch: the payload passes through untouched and
    // no filtering, decoding or progress tracking happens.
    if subscription.output() == OutputMode::Raw {
        return Ok(vec![OutputEvent::Raw(trace)]);
    }

    // Non-executed traces are expected noise, not failures. They still
    // count as delivered: the position advances so a resume never replays
    // them.
    if !trace.status.was_executed() {
        debug!(
            block_num = trace.block_num,
            status = ?trace.status,
            "dropping non-executed trace"
        );
        subscription.advance_progress(trace.block_num, &trace.cursor);
        return Ok(Vec::new());
    }

    // Searches see the original trace document, independent of the
    // receiver filter applied below.
    let search_results = if subscription.has_searches() {
        let doc = serde_json::to_value(&trace).unwrap_or_default();
        subscription.evaluate_searches(&doc)
    } else {
        None
    };

    let TraceEvent {
        cursor,
        undo,
        block_num,
        block_time,
        matching_actions,
        executed_actions,
        ..
    } = trace;

    let survivors = subscription.filter_actions(matching_actions);
    let mut actions = Vec::with_capacity(survivors.len());
    for action in survivors {
        actions.push(normalize_action(subscription, types, action).await?);
    }

    // Progress advances only once the event is fully processed, from the
    // position the event itself reported.
    subscription.advance_progress(block_num, &cursor);

    let context = TraceContext {
        block_num,
        block_time,
        cursor,
        undo,
    };

    let events = match subscription.output() {
        OutputMode::Serialized => actions
            .into_iter()
            .map(|action| {
                OutputEvent::Action(ActionOutput {
                    context: context.clone(),
                    action_seq: action.seq,
                    action,
                    search_results: search_results.clone(),
                })
            })
            .collect(),
        _ => vec![OutputEvent::Trace(TraceOutput {
            context,
            matching_actions: actions,
            executed_actions,
            search_results,
        })],
    };
    Ok(events)
}

async fn normalize_action(
    subscription: &Subscription,
    types: &TypeCache,
    action: ActionRecord,
) -> Result<NormalizedAction, ListenError> {
    let db_ops = match (subscription.has_db_ops(), action.db_ops) {
        (true, Some(ops)) => Some(decode_db_ops(subscription, types, ops).await?),
        _ => None,
    };
    Ok(NormalizedAction {
        seq: action.seq,
        receiver: action.receiver,
        account: action.account,
        name: action.name,
        json: action.json,
        db_ops,
    })
}

async fn decode_db_ops(
    subscription: &Subscription,
    types: &TypeCache,
    ops: Vec<DbOp>,
) -> Result<DecodedDbOps, ListenError> {
    if subscription.should_filter_db_ops() {
        let mut by_table: BTreeMap<String, Vec<DecodedDbOp>> = BTreeMap::new();
        for op in ops {
            // Ops on unrequested tables are dropped, not decoded.
            let Some(path) = subscription.db_op_type_path(&op.key.code, &op.key.table) else {
                continue;
            };
            let table = short_table_path(&op.key.code, &op.key.table);
            let decoded = decode_db_op(types, &path, op).await?;
            by_table.entry(table).or_default().push(decoded);
        }
        Ok(DecodedDbOps::ByTable(by_table))
    } else {
        let mut decoded = Vec::with_capacity(ops.len());
        for op in ops {
            if let Some(path) = subscription.db_op_type_path(&op.key.code, &op.key.table) {
                decoded.push(decode_db_op(types, &path, op).await?);
            }
        }
        Ok(DecodedDbOps::Flat(decoded))
    }
}

/// Decodes one op, each side independently from its own raw payload.
async fn decode_db_op(
    types: &TypeCache,
    type_path: &str,
    op: DbOp,
) -> Result<DecodedDbOp, ListenError> {
    let old_data = match op.old_data {
        Some(hex_data) => Some(types.decode(type_path, &hex_data).await?),
        None => None,
    };
    let new_data = match op.new_data {
        Some(hex_data) => Some(types.decode(type_path, &hex_data).await?),
        None => None,
    };
    Ok(DecodedDbOp {
        operation: op.operation,
        old_payer: op.old_payer,
        new_payer: op.new_payer,
        key: op.key,
        old_data,
        new_data,
    })
}
