//! End-to-end dispatcher behavior against scripted transports.

use bytes::Bytes;
use courier_common_async::callback_queue;
use courier_common_http::{FieldMap, RequestDescriptor, RequestKind};
use courier_dispatch::{Backoff, DispatchError, Dispatcher, FnSink, ResultEvent, RetryPolicy};
use courier_test_utils::{ScriptedTransport, Step};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Backoff::Fixed(Duration::from_millis(100))).unwrap()
}

fn dispatcher(transport: &Arc<ScriptedTransport>, max_attempts: u32) -> Dispatcher {
    Dispatcher::new(transport.clone(), policy(max_attempts)).unwrap()
}

async fn events(mut rx: mpsc::UnboundedReceiver<ResultEvent>) -> Vec<ResultEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn map(pairs: &[(&str, &str)]) -> FieldMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_fails_then_succeeds() {
    let transport = Arc::new(ScriptedTransport::fail_then_succeed(2, "payload"));
    let (tx, rx) = mpsc::unbounded_channel();

    dispatcher(&transport, 5).get("https://api.example.com/items", tx);
    let mut events = events(rx).await;

    assert_eq!(transport.calls(), 3);
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], ResultEvent::Acquired(_)));
    match events.pop() {
        Some(ResultEvent::Success(response)) => {
            assert_eq!(response.text().await.unwrap(), "payload");
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_always_failing_stops_at_ceiling() {
    let transport = Arc::new(ScriptedTransport::always_fail());
    let (tx, rx) = mpsc::unbounded_channel();

    dispatcher(&transport, 4).post_form("https://api.example.com/login", tx);
    let events = events(rx).await;

    assert_eq!(transport.calls(), 4);
    assert_eq!(events.len(), 2);
    match &events[1] {
        ResultEvent::Failure(err) => {
            assert_eq!(err.attempts(), Some(4));
            assert_eq!(err.last_transport_error().unwrap().to_string(), "call 4 failed");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancel_right_after_acquired() {
    let transport = Arc::new(ScriptedTransport::succeed("late").with_latency(Duration::from_secs(1)));
    let (tx, mut rx) = mpsc::unbounded_channel();

    dispatcher(&transport, 3).get("https://api.example.com/slow", tx);

    match rx.recv().await {
        Some(ResultEvent::Acquired(subscription)) => subscription.cancel(),
        other => panic!("expected acquired, got {other:?}"),
    }

    let next = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
    assert!(!matches!(next, Ok(Some(_))), "event after cancel: {next:?}");
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_backoff_stops_calls() {
    let transport = Arc::new(ScriptedTransport::always_fail());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let dispatcher = Dispatcher::new(
        transport.clone(),
        RetryPolicy::new(10, Backoff::Fixed(Duration::from_secs(30))).unwrap(),
    )
    .unwrap();

    dispatcher.get("https://api.example.com/flaky", tx);
    let subscription = match rx.recv().await {
        Some(ResultEvent::Acquired(subscription)) => subscription,
        other => panic!("expected acquired, got {other:?}"),
    };

    assert!(transport.wait_for_calls(1, Duration::from_secs(1)).await);
    subscription.cancel();
    tokio::time::sleep(Duration::from_secs(300)).await;

    assert_eq!(transport.calls(), 1);
    assert!(rx.recv().await.is_none());
    assert!(!subscription.is_active());
}

#[tokio::test]
async fn test_empty_json_is_dropped() {
    let transport = Arc::new(ScriptedTransport::succeed("ok"));
    let (tx, mut rx) = mpsc::unbounded_channel();

    dispatcher(&transport, 3).post_json("https://api.example.com/json", "", tx);

    assert!(rx.recv().await.is_none());
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_empty_url_fails_without_transport_call() {
    let transport = Arc::new(ScriptedTransport::succeed("ok"));
    let (tx, rx) = mpsc::unbounded_channel();

    dispatcher(&transport, 3).download_file("", tx);
    let events = events(rx).await;

    assert_eq!(transport.calls(), 0);
    assert_eq!(events.len(), 2);
    assert!(matches!(
        events[1],
        ResultEvent::Failure(DispatchError::MalformedRequest(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_twice_matches_cancel_once() {
    let transport = Arc::new(ScriptedTransport::succeed("ok").with_latency(Duration::from_secs(1)));
    let (tx, mut rx) = mpsc::unbounded_channel();

    dispatcher(&transport, 3).get("https://api.example.com/a", tx);
    let subscription = match rx.recv().await {
        Some(ResultEvent::Acquired(subscription)) => subscription,
        other => panic!("expected acquired, got {other:?}"),
    };

    subscription.cancel();
    subscription.cancel();

    assert!(subscription.is_cancelled());
    assert!(rx.recv().await.is_none());
    assert!(transport.calls() <= 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_dispatches_retry_independently() {
    let failing = Arc::new(ScriptedTransport::always_fail());
    let healthy = Arc::new(ScriptedTransport::fail_then_succeed(1, "ok"));
    let shared_policy = policy(3);

    let a = Dispatcher::new(failing.clone(), shared_policy.clone()).unwrap();
    let b = Dispatcher::new(healthy.clone(), shared_policy).unwrap();

    let (tx_a, rx_a) = mpsc::unbounded_channel();
    let (tx_b, rx_b) = mpsc::unbounded_channel();
    a.get("https://a.example.com", tx_a);
    b.get("https://b.example.com", tx_b);

    let (events_a, events_b) = tokio::join!(events(rx_a), events(rx_b));

    assert!(matches!(events_a[1], ResultEvent::Failure(_)));
    assert!(matches!(events_b[1], ResultEvent::Success(_)));
    assert_eq!(failing.calls(), 3);
    assert_eq!(healthy.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_same_dispatcher_runs_many_dispatches() {
    let transport = Arc::new(ScriptedTransport::succeed("ok"));
    let dispatcher = dispatcher(&transport, 2);

    let mut receivers = Vec::new();
    for i in 0..8 {
        let (tx, rx) = mpsc::unbounded_channel();
        dispatcher.get(&format!("https://api.example.com/{i}"), tx);
        receivers.push(rx);
    }

    for rx in receivers {
        let events = events(rx).await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], ResultEvent::Success(_)));
    }
    assert_eq!(transport.calls(), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_callbacks_run_on_callback_queue() {
    let transport = Arc::new(ScriptedTransport::fail_then_succeed(1, "ok"));
    let (queue, mut receiver) = callback_queue();
    let dispatcher = Dispatcher::builder(transport.clone())
        .retry_policy(policy(3))
        .callback_context(queue)
        .build()
        .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let caller = std::thread::current().id();
    dispatcher.get(
        "https://api.example.com/ui",
        FnSink::new(move |event: ResultEvent| {
            assert_eq!(std::thread::current().id(), caller);
            log.lock().unwrap().push(event.is_terminal());
        }),
    );
    drop(dispatcher);

    while receiver.run_next().await {}

    assert_eq!(*seen.lock().unwrap(), vec![false, true]);
}

#[tokio::test]
async fn test_download_stream_passes_through() {
    let chunks = vec![Bytes::from_static(b"abc"), Bytes::from_static(b"def")];
    let transport = Arc::new(ScriptedTransport::new(vec![Step::Stream(chunks)], Step::Fail));
    let (tx, rx) = mpsc::unbounded_channel();

    dispatcher(&transport, 1).download_file("https://cdn.example.com/file.bin", tx);
    let mut events = events(rx).await;

    match events.pop() {
        Some(ResultEvent::Success(response)) => {
            assert!(response.is_stream());
            assert_eq!(response.bytes().await.unwrap(), Bytes::from_static(b"abcdef"));
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_hint_delays_retry() {
    let transport = Arc::new(ScriptedTransport::new(
        vec![Step::RateLimited(Some(Duration::from_secs(20)))],
        Step::Succeed(Bytes::from_static(b"ok")),
    ));
    let policy = RetryPolicy::new(
        3,
        Backoff::Exponential {
            initial: Duration::from_millis(100),
            multiplier: 2.0,
            max: Duration::from_secs(30),
        },
    )
    .unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let start = tokio::time::Instant::now();

    Dispatcher::new(transport.clone(), policy)
        .unwrap()
        .get("https://api.example.com/limited", tx);
    let events = events(rx).await;

    assert!(matches!(events[1], ResultEvent::Success(_)));
    assert!(start.elapsed() >= Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_hint_cannot_exceed_backoff_cap() {
    let transport = Arc::new(ScriptedTransport::new(
        vec![Step::RateLimited(Some(Duration::from_secs(86_400)))],
        Step::Succeed(Bytes::from_static(b"ok")),
    ));
    let (tx, rx) = mpsc::unbounded_channel();
    let start = tokio::time::Instant::now();

    dispatcher(&transport, 3).get("https://api.example.com/limited", tx);
    let events = events(rx).await;

    assert!(matches!(events[1], ResultEvent::Success(_)));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_descriptors_reach_transport_as_built() {
    let transport = Arc::new(ScriptedTransport::succeed("ok"));
    let dispatcher = dispatcher(&transport, 1);
    let headers = map(&[("x-token", "t")]);
    let params = map(&[("name", "neo")]);
    let empty = FieldMap::new();

    let mut pending = Vec::new();
    let mut sink = || {
        let (tx, rx) = mpsc::unbounded_channel();
        pending.push(rx);
        tx
    };

    dispatcher.get_with_params("https://h/a", Some(&empty), sink());
    dispatcher.get_with_params("https://h/b", Some(&params), sink());
    dispatcher.post_form_with_params("https://h/c", Some(&params), sink());
    dispatcher.post_form_with_headers_and_params("https://h/d", Some(&headers), Some(&empty), sink());
    dispatcher.post_form_with_headers_and_params("https://h/e", None, None, sink());
    dispatcher.post_json_with_headers("https://h/f", Some(&headers), "{}", sink());
    dispatcher.upload_single_file("https://h/g", "/tmp/avatar.png", sink());
    dispatcher.upload_with_params("https://h/h", "/tmp/avatar.png", Some(&params), sink());
    dispatcher.dispatch(
        RequestDescriptor::Download {
            url: "https://h/i".to_string(),
        },
        sink(),
    );

    for rx in pending {
        events(rx).await;
    }

    let mut kinds: Vec<(String, RequestKind)> = transport
        .descriptors()
        .iter()
        .map(|d| (d.url().to_string(), d.kind()))
        .collect();
    kinds.sort_by(|a, b| a.0.cmp(&b.0));

    assert_eq!(
        kinds.into_iter().map(|(_, k)| k).collect::<Vec<_>>(),
        vec![
            RequestKind::Get,
            RequestKind::GetWithParams,
            RequestKind::PostFormWithParams,
            RequestKind::PostFormWithHeaders,
            RequestKind::PostForm,
            RequestKind::PostJsonWithHeaders,
            RequestKind::UploadFile,
            RequestKind::UploadFileWithParams,
            RequestKind::Download,
        ]
    );
}

#[tokio::test]
async fn test_prebuilt_descriptors_follow_builder_rules() {
    let transport = Arc::new(ScriptedTransport::succeed("ok"));
    let dispatcher = dispatcher(&transport, 3);

    let (tx, mut rx) = mpsc::unbounded_channel();
    dispatcher.dispatch(
        RequestDescriptor::PostJson {
            url: "https://api.example.com/json".to_string(),
            body: String::new(),
        },
        tx,
    );
    assert!(rx.recv().await.is_none());

    let (tx, rx) = mpsc::unbounded_channel();
    dispatcher.dispatch(
        RequestDescriptor::GetWithParams {
            url: "https://api.example.com/items".to_string(),
            params: FieldMap::new(),
        },
        tx,
    );
    assert!(matches!(events(rx).await[1], ResultEvent::Success(_)));

    let (tx, rx) = mpsc::unbounded_channel();
    dispatcher.dispatch(RequestDescriptor::Get { url: String::new() }, tx);
    let failed = events(rx).await;
    assert!(matches!(
        failed[1],
        ResultEvent::Failure(DispatchError::MalformedRequest(_))
    ));

    assert_eq!(transport.calls(), 1);
    let kinds: Vec<RequestKind> = transport.descriptors().iter().map(|d| d.kind()).collect();
    assert_eq!(kinds, vec![RequestKind::Get]);
}

#[tokio::test(start_paused = true)]
async fn test_subscription_inactive_when_terminal_arrives() {
    let transport = Arc::new(ScriptedTransport::fail_then_succeed(1, "ok"));
    let subscription = Arc::new(Mutex::new(None));
    let seen = Arc::new(Mutex::new(None));

    let held = subscription.clone();
    let log = seen.clone();
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    dispatcher(&transport, 3).get(
        "https://api.example.com/items",
        FnSink::new(move |event: ResultEvent| match event {
            ResultEvent::Acquired(sub) => *held.lock().unwrap() = Some(sub),
            _ => {
                let active = held.lock().unwrap().as_ref().map(|sub| sub.is_active());
                *log.lock().unwrap() = active;
                let _ = done_tx.send(());
            }
        }),
    );

    done_rx.recv().await.unwrap();
    assert_eq!(*seen.lock().unwrap(), Some(false));
}
