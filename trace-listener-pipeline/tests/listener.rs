//! Integration tests for the trace listener pipeline.
//!
//! Wires a scripted in-memory transport and an in-memory schema provider
//! through `TraceListener::open` and drives full subscriptions end to end.
//!
//! Run with: `cargo test --test listener`

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::{broadcast, mpsc};

use trace_listener_pipeline::abi::{ContractSchema, SchemaProvider, TypeCache, TypeDecoder};
use trace_listener_pipeline::errors::{DecodeFailure, SchemaFetchError, TransportError};
use trace_listener_pipeline::normalizer::{OutputEvent, StreamMessage, StreamTraces};
use trace_listener_pipeline::subscription::{OutputMode, TableSpec, TraceQuery};
use trace_listener_pipeline::{ListenError, SubscriptionMessage, TraceListener, SubscriptionRequest};

use trace_listener_shared::types::{
    ActionRecord, DbOp, DbOpKey, DbOperation, TraceEvent, TraceStatus,
};

/// Replays a fixed script of stream messages, then either completes the
/// stream or holds it open until shutdown.
struct ScriptedTransport {
    script: Vec<StreamMessage>,
    hold_open: bool,
}

impl ScriptedTransport {
    fn completing(script: Vec<StreamMessage>) -> Self {
        Self {
            script,
            hold_open: false,
        }
    }

    fn holding_open(script: Vec<StreamMessage>) -> Self {
        Self {
            script,
            hold_open: true,
        }
    }
}

#[async_trait]
impl StreamTraces for ScriptedTransport {
    async fn stream_traces(
        &self,
        _query: &TraceQuery,
        sender: mpsc::Sender<StreamMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), TransportError> {
        for message in self.script.clone() {
            if sender.send(message).await.is_err() {
                return Ok(());
            }
        }
        if self.hold_open {
            let _ = shutdown.recv().await;
        } else {
            let _ = sender.send(StreamMessage::End).await;
        }
        Ok(())
    }
}

/// Decodes any payload to `{"hex": "<payload>"}`.
struct HexEchoDecoder;

impl TypeDecoder for HexEchoDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Value, DecodeFailure> {
        Ok(json!({ "hex": hex::encode(bytes) }))
    }
}

struct EchoSchema;

impl ContractSchema for EchoSchema {
    fn extract_type(&self, _type_name: &str) -> Option<Arc<dyn TypeDecoder>> {
        Some(Arc::new(HexEchoDecoder))
    }
}

struct CountingProvider {
    fetches: AtomicUsize,
}

impl CountingProvider {
    fn new() -> Self {
        Self {
            fetches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SchemaProvider for CountingProvider {
    async fn fetch_schema(
        &self,
        _account: &str,
    ) -> Result<Arc<dyn ContractSchema>, SchemaFetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(EchoSchema))
    }
}

fn make_action(receiver: &str, account: &str, name: &str) -> ActionRecord {
    ActionRecord {
        seq: Some(1),
        receiver: receiver.to_string(),
        account: account.to_string(),
        name: name.to_string(),
        json: Some(json!({ "memo": "hi" })),
        db_ops: None,
    }
}

fn make_trace(cursor: &str, block_num: u64, actions: Vec<ActionRecord>) -> TraceEvent {
    TraceEvent {
        cursor: cursor.to_string(),
        undo: false,
        status: TraceStatus::Executed,
        block_num,
        block_time: None,
        matching_actions: actions,
        executed_actions: None,
    }
}

fn make_listener(
    transport: ScriptedTransport,
) -> (TraceListener, Arc<CountingProvider>) {
    let provider = Arc::new(CountingProvider::new());
    let types = Arc::new(TypeCache::new(Arc::clone(&provider) as Arc<dyn SchemaProvider>));
    (TraceListener::new(Arc::new(transport), types), provider)
}

fn transfer_request() -> SubscriptionRequest {
    SubscriptionRequest {
        filter_query: "receiver:token action:transfer".to_string(),
        ..Default::default()
    }
}

async fn next_trace_output(
    handle: &mut trace_listener_pipeline::SubscriptionHandle,
) -> trace_listener_pipeline::normalizer::TraceOutput {
    match handle.next().await {
        Some(SubscriptionMessage::Event(OutputEvent::Trace(output))) => output,
        other => panic!("expected an aggregate trace event, got {other:?}"),
    }
}

#[tokio::test]
async fn test_aggregate_subscription_end_to_end() {
    let transport = ScriptedTransport::completing(vec![
        StreamMessage::Trace(make_trace(
            "cursor-1",
            100,
            vec![make_action("token", "token", "transfer")],
        )),
        StreamMessage::Trace(make_trace(
            "cursor-2",
            101,
            vec![make_action("alice", "token", "transfer")],
        )),
    ]);
    let (listener, _provider) = make_listener(transport);

    let mut handle = listener.open(transfer_request()).await.unwrap();

    let first = next_trace_output(&mut handle).await;
    assert_eq!(first.context.block_num, 100);
    assert_eq!(first.context.cursor, "cursor-1");
    assert_eq!(first.matching_actions.len(), 1);
    assert_eq!(first.matching_actions[0].name, "transfer");

    let second = next_trace_output(&mut handle).await;
    assert_eq!(second.context.block_num, 101);

    assert!(matches!(handle.next().await, Some(SubscriptionMessage::End)));
    assert!(handle.next().await.is_none());

    handle.join().await;
}

#[tokio::test]
async fn test_position_advances_with_each_processed_trace() {
    let mut failed = make_trace("cursor-3", 110, vec![]);
    failed.status = TraceStatus::SoftFail;

    let transport = ScriptedTransport::completing(vec![
        StreamMessage::Trace(make_trace("cursor-1", 100, vec![])),
        StreamMessage::Trace(make_trace("cursor-2", 105, vec![])),
        // Dropped from the output, but still delivered: a resume must pick
        // up after it.
        StreamMessage::Trace(failed),
    ]);
    let (listener, _provider) = make_listener(transport);

    let mut handle = listener.open(transfer_request()).await.unwrap();

    assert_eq!(handle.position().block_num, 0);
    assert_eq!(handle.position().cursor, None);

    while let Some(message) = handle.next().await {
        if matches!(message, SubscriptionMessage::End) {
            break;
        }
    }

    let position = handle.position();
    assert_eq!(position.block_num, 110);
    assert_eq!(position.cursor.as_deref(), Some("cursor-3"));
}

#[tokio::test]
async fn test_undo_trace_passes_through_with_flag_set() {
    let mut trace = make_trace("cursor-1", 100, vec![make_action("token", "token", "transfer")]);
    trace.undo = true;

    let transport = ScriptedTransport::completing(vec![StreamMessage::Trace(trace)]);
    let (listener, _provider) = make_listener(transport);

    let mut handle = listener.open(transfer_request()).await.unwrap();

    let output = next_trace_output(&mut handle).await;
    assert!(output.context.undo);
    assert_eq!(output.matching_actions.len(), 1);
}

#[tokio::test]
async fn test_transport_error_terminates_the_subscription() {
    let transport = ScriptedTransport::holding_open(vec![
        StreamMessage::Trace(make_trace("cursor-1", 100, vec![])),
        StreamMessage::Error(TransportError::Stream("connection reset".to_string())),
    ]);
    let (listener, _provider) = make_listener(transport);

    let mut handle = listener.open(transfer_request()).await.unwrap();

    assert!(matches!(
        handle.next().await,
        Some(SubscriptionMessage::Event(_))
    ));
    match handle.next().await {
        Some(SubscriptionMessage::Error(ListenError::Transport(err))) => {
            assert_eq!(err, TransportError::Stream("connection reset".to_string()));
        }
        other => panic!("expected a transport error, got {other:?}"),
    }
    // Nothing follows the error, not even an end marker.
    assert!(handle.next().await.is_none());

    handle.stop();
    handle.join().await;
}

#[tokio::test]
async fn test_stop_shuts_down_both_tasks() {
    let transport = ScriptedTransport::holding_open(vec![StreamMessage::Trace(make_trace(
        "cursor-1",
        100,
        vec![make_action("token", "token", "transfer")],
    ))]);
    let (listener, _provider) = make_listener(transport);

    let mut handle = listener.open(transfer_request()).await.unwrap();

    let _ = next_trace_output(&mut handle).await;
    handle.stop();

    while handle.next().await.is_some() {}
    handle.join().await;
}

#[tokio::test]
async fn test_invalid_request_is_rejected_before_opening() {
    let (listener, provider) = make_listener(ScriptedTransport::completing(vec![]));

    let result = listener
        .open(SubscriptionRequest {
            filter_query: String::new(),
            ..Default::default()
        })
        .await;

    assert!(matches!(result, Err(ListenError::Configuration(_))));
    assert_eq!(provider.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_serialized_subscription_emits_one_event_per_action() {
    let transport = ScriptedTransport::completing(vec![StreamMessage::Trace(make_trace(
        "cursor-1",
        100,
        vec![
            make_action("token", "token", "transfer"),
            make_action("alice", "token", "transfer"),
        ],
    ))]);
    let (listener, _provider) = make_listener(transport);

    let mut handle = listener
        .open(SubscriptionRequest {
            output: OutputMode::Serialized,
            ..transfer_request()
        })
        .await
        .unwrap();

    let mut receivers = Vec::new();
    while let Some(message) = handle.next().await {
        match message {
            SubscriptionMessage::Event(OutputEvent::Action(output)) => {
                assert_eq!(output.context.cursor, "cursor-1");
                receivers.push(output.action.receiver.clone());
            }
            SubscriptionMessage::End => break,
            other => panic!("unexpected message {other:?}"),
        }
    }

    assert_eq!(receivers, vec!["token".to_string(), "alice".to_string()]);
}

#[tokio::test]
async fn test_db_ops_decode_through_a_single_schema_fetch() {
    let db_op = DbOp {
        operation: DbOperation::Insert,
        old_payer: None,
        new_payer: Some("alice".to_string()),
        key: DbOpKey {
            code: "token".to_string(),
            table: "accounts".to_string(),
            scope: "alice".to_string(),
            key: "EOS".to_string(),
        },
        old_data: None,
        new_data: Some("00ff".to_string()),
    };
    let mut action = make_action("token", "token", "transfer");
    action.db_ops = Some(vec![db_op]);

    let transport = ScriptedTransport::completing(vec![
        StreamMessage::Trace(make_trace("cursor-1", 100, vec![action.clone()])),
        StreamMessage::Trace(make_trace("cursor-2", 101, vec![action])),
    ]);
    let (listener, provider) = make_listener(transport);

    let mut handle = listener
        .open(SubscriptionRequest {
            db_op_tables: Some(vec![TableSpec {
                account: "token".to_string(),
                table: "accounts".to_string(),
                type_name: "account".to_string(),
            }]),
            ..transfer_request()
        })
        .await
        .unwrap();

    let first = next_trace_output(&mut handle).await;
    let decoded = serde_json::to_value(&first.matching_actions[0].db_ops).unwrap();
    assert_eq!(
        decoded["token/accounts"][0]["newData"],
        json!({ "hex": "00ff" })
    );
    assert_eq!(decoded["token/accounts"][0]["oldData"], Value::Null);

    let _ = next_trace_output(&mut handle).await;
    assert!(matches!(handle.next().await, Some(SubscriptionMessage::End)));

    // Warmed at open time, reused for both traces.
    assert_eq!(provider.fetches.load(Ordering::SeqCst), 1);
}
