//! 分发流水线的端到端测试：校验、路由、重试、事件和异步发送

use notify_dispatch::config::DispatchConfig;
use notify_dispatch::notification::providers::{FcmConfig, SendGridConfig, TwilioConfig};
use notify_dispatch::notification::{
    Channel, DispatchError, DispatcherBuilder, ErrorCode, EventSink, InMemoryEventBus, Message,
    Metadata, Notification, NotificationDispatcher, NotificationEvent, ProviderError,
    ProviderStrategy, Recipient, RetryingProvider, SendResult, ValidationError, Validator,
    CancellationToken, CORRELATION_PREFIX,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 测试用 provider 的行为
enum Behavior {
    Succeed,
    AlwaysFail,
    /// 前 n 次失败，之后成功
    FailTimes(usize),
    RejectInput,
}

struct FakeProvider {
    channel: Channel,
    name: &'static str,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl FakeProvider {
    fn new(channel: Channel, name: &'static str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            channel,
            name,
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ProviderStrategy for FakeProvider {
    fn channel(&self) -> Channel {
        self.channel
    }

    fn provider_name(&self) -> &str {
        self.name
    }

    fn send(&self, _notification: &Notification) -> Result<SendResult, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.behavior {
            Behavior::Succeed => Ok(SendResult::ok(self.name, format!("{}-{}", self.name, call))),
            Behavior::AlwaysFail => Err(ProviderError::Unavailable("provider down".to_string())),
            Behavior::FailTimes(n) if call <= n => {
                Err(ProviderError::Transient(format!("timeout on attempt {}", call)))
            }
            Behavior::FailTimes(_) => Ok(SendResult::ok(self.name, "ok-after-retry")),
            Behavior::RejectInput => Err(ValidationError::new("template variables missing").into()),
        }
    }
}

/// 拒绝一切的校验器，同时记录调用次数
#[derive(Default)]
struct RejectAll {
    calls: AtomicUsize,
}

impl Validator for RejectAll {
    fn validate(&self, _notification: &Notification) -> Result<(), ValidationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ValidationError::new("rejected by policy"))
    }
}

/// 只计数、总是通过的校验器
#[derive(Default)]
struct CountingValidator {
    calls: AtomicUsize,
}

impl Validator for CountingValidator {
    fn validate(&self, _notification: &Notification) -> Result<(), ValidationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

type Recorded = Arc<Mutex<Vec<NotificationEvent>>>;

fn recording_bus() -> (Arc<InMemoryEventBus>, Recorded) {
    let bus = Arc::new(InMemoryEventBus::new());
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let sink = recorded.clone();
    bus.subscribe(Box::new(move |event: &NotificationEvent| {
        sink.lock().unwrap().push(event.clone());
    }));
    (bus, recorded)
}

fn kinds(recorded: &Recorded) -> Vec<&'static str> {
    recorded.lock().unwrap().iter().map(|e| e.kind()).collect()
}

fn dispatcher_with(provider: Arc<FakeProvider>, bus: Arc<InMemoryEventBus>) -> NotificationDispatcher {
    DispatcherBuilder::new().register(provider).event_sink(bus).build()
}

fn sample(channel: Channel) -> Notification {
    match channel {
        Channel::Email => Notification::email("user@mail.com", "Hi", "Welcome"),
        Channel::Sms => Notification::sms("+521234567890", "Your code is 123456"),
        Channel::Push => Notification::push("device-token-abc", "Promo", "50% off"),
    }
}

#[test]
fn test_valid_notifications_are_sent_on_every_channel() {
    for (channel, name) in [
        (Channel::Email, "sendgrid"),
        (Channel::Sms, "twilio"),
        (Channel::Push, "fcm"),
    ] {
        let provider = FakeProvider::new(channel, name, Behavior::Succeed);
        let (bus, recorded) = recording_bus();
        let dispatcher = dispatcher_with(provider.clone(), bus);

        let result = dispatcher.send(&sample(channel)).unwrap();

        assert!(result.success());
        assert_eq!(result.provider_name(), name);
        assert!(result.provider_message_id().is_some());
        assert!(result.error().is_none());
        assert_eq!(provider.calls(), 1);
        assert_eq!(kinds(&recorded), vec!["requested", "sent"]);
    }
}

#[test]
fn test_mismatched_recipient_is_rejected_before_provider() {
    let provider = FakeProvider::new(Channel::Sms, "twilio", Behavior::Succeed);
    let (bus, recorded) = recording_bus();
    let dispatcher = dispatcher_with(provider.clone(), bus);

    let notification = Notification::new(
        Channel::Sms,
        Recipient::email("user@mail.com"),
        Message::sms("hola"),
        Metadata::new("corr-mismatch"),
    );
    let err = dispatcher.send(&notification).unwrap_err();

    assert!(err.is_validation());
    assert_eq!(provider.calls(), 0);
    assert!(recorded.lock().unwrap().is_empty());
}

#[test]
fn test_mismatched_message_is_rejected_before_provider() {
    let provider = FakeProvider::new(Channel::Push, "fcm", Behavior::Succeed);
    let (bus, recorded) = recording_bus();
    let dispatcher = dispatcher_with(provider.clone(), bus);

    let notification = Notification::new(
        Channel::Push,
        Recipient::device("device-token-abc"),
        Message::email("Hi", "Welcome"),
        Metadata::empty(),
    );

    match dispatcher.send(&notification) {
        Err(DispatchError::Validation(e)) => assert_eq!(e.reason(), "PUSH requires a push message"),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(provider.calls(), 0);
    assert!(recorded.lock().unwrap().is_empty());
}

#[test]
fn test_custom_validator_rejection_publishes_nothing() {
    let provider = FakeProvider::new(Channel::Email, "sendgrid", Behavior::Succeed);
    let validator = Arc::new(RejectAll::default());
    let (bus, recorded) = recording_bus();
    let dispatcher = DispatcherBuilder::new()
        .register(provider.clone())
        .validator(validator.clone())
        .event_sink(bus)
        .build();

    let err = dispatcher.send(&sample(Channel::Email)).unwrap_err();

    assert!(matches!(err, DispatchError::Validation(ref e) if e.reason() == "rejected by policy"));
    assert_eq!(validator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(provider.calls(), 0);
    assert!(recorded.lock().unwrap().is_empty());
}

#[test]
fn test_provider_failure_emits_requested_then_failed() {
    let provider = FakeProvider::new(Channel::Email, "sendgrid", Behavior::AlwaysFail);
    let (bus, recorded) = recording_bus();
    let dispatcher = dispatcher_with(provider.clone(), bus);

    let err = dispatcher.send(&sample(Channel::Email)).unwrap_err();

    match err {
        DispatchError::SendFailed { provider, source } => {
            assert_eq!(provider, "sendgrid");
            assert!(matches!(source, ProviderError::Unavailable(_)));
        }
        other => panic!("expected SendFailed, got {:?}", other),
    }
    assert_eq!(provider.calls(), 1);

    let events = recorded.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind(), "requested");
    match &events[1] {
        NotificationEvent::Failed { error, .. } => {
            assert_eq!(error.code, ErrorCode::ProviderError);
            assert!(error.message.contains("provider down"));
        }
        other => panic!("expected Failed, got {:?}", other),
    }
}

#[test]
fn test_retry_recovers_from_transient_failures() {
    let provider = FakeProvider::new(Channel::Sms, "twilio", Behavior::FailTimes(2));
    let (bus, recorded) = recording_bus();
    let dispatcher = DispatcherBuilder::new()
        .register(RetryingProvider::new(provider.clone(), 3, Duration::from_millis(1)))
        .event_sink(bus)
        .build();

    let result = dispatcher.send(&sample(Channel::Sms)).unwrap();

    assert!(result.success());
    assert_eq!(result.provider_message_id(), Some("ok-after-retry"));
    assert_eq!(provider.calls(), 3);
    // 中间的失败尝试不会产生事件
    assert_eq!(kinds(&recorded), vec!["requested", "sent"]);
}

#[test]
fn test_retry_gives_up_after_max_attempts() {
    let provider = FakeProvider::new(Channel::Sms, "twilio", Behavior::FailTimes(5));
    let (bus, recorded) = recording_bus();
    let dispatcher = DispatcherBuilder::new()
        .register(RetryingProvider::new(provider.clone(), 3, Duration::from_millis(1)))
        .event_sink(bus)
        .build();

    let err = dispatcher.send(&sample(Channel::Sms)).unwrap_err();

    match err {
        DispatchError::SendFailed {
            provider,
            source: ProviderError::RetriesExhausted { attempts, last },
        } => {
            assert_eq!(provider, "twilio");
            assert_eq!(attempts, 3);
            assert!(matches!(*last, ProviderError::Transient(ref m) if m == "timeout on attempt 3"));
        }
        other => panic!("expected exhausted retries, got {:?}", other),
    }
    assert_eq!(provider.calls(), 3);

    let events = recorded.lock().unwrap();
    assert_eq!(events.len(), 2);
    match &events[1] {
        NotificationEvent::Failed { error, .. } => {
            assert_eq!(error.code, ErrorCode::TransientError);
            assert_eq!(error.cause.as_deref(), Some("transient error: timeout on attempt 3"));
        }
        other => panic!("expected Failed, got {:?}", other),
    }
}

#[test]
fn test_provider_side_validation_is_not_retried() {
    let provider = FakeProvider::new(Channel::Email, "sendgrid", Behavior::RejectInput);
    let (bus, recorded) = recording_bus();
    let dispatcher = DispatcherBuilder::new()
        .register(RetryingProvider::new(provider.clone(), 3, Duration::from_millis(1)))
        .event_sink(bus)
        .build();

    let err = dispatcher.send(&sample(Channel::Email)).unwrap_err();

    assert!(matches!(err, DispatchError::Validation(ref e) if e.reason() == "template variables missing"));
    assert_eq!(provider.calls(), 1);
    assert_eq!(kinds(&recorded), vec!["requested", "failed"]);
    match &recorded.lock().unwrap()[1] {
        NotificationEvent::Failed { error, .. } => assert_eq!(error.code, ErrorCode::ValidationError),
        other => panic!("expected Failed, got {:?}", other),
    };
}

#[test]
fn test_supplied_correlation_id_is_echoed() {
    let provider = FakeProvider::new(Channel::Email, "sendgrid", Behavior::Succeed);
    let (bus, recorded) = recording_bus();
    let dispatcher = dispatcher_with(provider, bus);

    let notification = Notification::builder(Channel::Email)
        .recipient(Recipient::email("user@mail.com"))
        .message(Message::email("Hi", "Welcome"))
        .correlation_id("corr-demo-001")
        .build()
        .unwrap();
    dispatcher.send(&notification).unwrap();

    let events = recorded.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.correlation_id() == "corr-demo-001"));
}

#[test]
fn test_missing_correlation_id_is_generated_once() {
    let provider = FakeProvider::new(Channel::Push, "fcm", Behavior::Succeed);
    let (bus, recorded) = recording_bus();
    let dispatcher = dispatcher_with(provider, bus);

    dispatcher.send(&sample(Channel::Push)).unwrap();
    dispatcher.send(&sample(Channel::Push)).unwrap();

    let events = recorded.lock().unwrap();
    assert_eq!(events.len(), 4);
    let first = events[0].correlation_id();
    assert!(first.starts_with(CORRELATION_PREFIX));
    assert!(first.len() > CORRELATION_PREFIX.len());
    assert_eq!(events[1].correlation_id(), first);
    // 每次分发生成新的 id
    assert_ne!(events[2].correlation_id(), first);
    assert_eq!(events[2].correlation_id(), events[3].correlation_id());
}

#[test]
fn test_missing_provider_is_configuration_error() {
    let provider = FakeProvider::new(Channel::Email, "sendgrid", Behavior::Succeed);
    let validator = Arc::new(CountingValidator::default());
    let (bus, recorded) = recording_bus();
    let dispatcher = DispatcherBuilder::new()
        .register(provider.clone())
        .validator(validator.clone())
        .event_sink(bus)
        .build();

    let err = dispatcher.send(&sample(Channel::Sms)).unwrap_err();

    match err {
        DispatchError::Configuration(e) => assert_eq!(e.channel, Channel::Sms),
        other => panic!("expected configuration error, got {:?}", other),
    }
    assert_eq!(validator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(provider.calls(), 0);
    // Requested 已发布，没有终态事件
    assert_eq!(kinds(&recorded), vec!["requested"]);
}

#[test]
fn test_later_registration_replaces_earlier() {
    let first = FakeProvider::new(Channel::Email, "first", Behavior::Succeed);
    let second = FakeProvider::new(Channel::Email, "second", Behavior::Succeed);
    let dispatcher = DispatcherBuilder::new()
        .register(first.clone())
        .register(second.clone())
        .build();

    let result = dispatcher.send(&sample(Channel::Email)).unwrap();

    assert_eq!(result.provider_name(), "second");
    assert_eq!(first.calls(), 0);
    assert_eq!(second.calls(), 1);
}

#[test]
fn test_panicking_listener_does_not_break_dispatch() {
    let provider = FakeProvider::new(Channel::Email, "sendgrid", Behavior::Succeed);
    let (bus, recorded) = recording_bus();
    bus.subscribe(Box::new(|_: &NotificationEvent| panic!("listener bug")));
    let dispatcher = dispatcher_with(provider, bus);

    let result = dispatcher.send(&sample(Channel::Email)).unwrap();

    assert!(result.success());
    assert_eq!(kinds(&recorded), vec!["requested", "sent"]);
}

fn retrying_dispatcher(failures: usize) -> (Arc<FakeProvider>, Recorded, NotificationDispatcher) {
    let provider = FakeProvider::new(Channel::Sms, "twilio", Behavior::FailTimes(failures));
    let (bus, recorded) = recording_bus();
    let dispatcher = DispatcherBuilder::new()
        .register(RetryingProvider::new(provider.clone(), 3, Duration::from_millis(1)))
        .event_sink(bus)
        .build();
    (provider, recorded, dispatcher)
}

fn event_trace(recorded: &Recorded) -> Vec<(&'static str, String)> {
    recorded
        .lock()
        .unwrap()
        .iter()
        .map(|e| (e.kind(), e.correlation_id().to_string()))
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_async_matches_sync_outcome() {
    let notification = Notification::builder(Channel::Sms)
        .recipient(Recipient::phone("+521234567890"))
        .message(Message::sms("Your code is 123456"))
        .correlation_id("corr-async-1")
        .build()
        .unwrap();

    let (sync_provider, sync_recorded, sync_dispatcher) = retrying_dispatcher(2);
    let sync_result = tokio::task::block_in_place(|| sync_dispatcher.send(&notification)).unwrap();

    let (async_provider, async_recorded, async_dispatcher) = retrying_dispatcher(2);
    let async_result = async_dispatcher.send_async(notification.clone()).await.unwrap();

    assert_eq!(async_result.success(), sync_result.success());
    assert_eq!(async_result.provider_name(), sync_result.provider_name());
    assert_eq!(async_result.provider_message_id(), sync_result.provider_message_id());
    assert_eq!(async_result.provider_message_id(), Some("ok-after-retry"));
    assert_eq!(async_provider.calls(), sync_provider.calls());

    let sync_trace = event_trace(&sync_recorded);
    assert_eq!(
        sync_trace,
        vec![
            ("requested", "corr-async-1".to_string()),
            ("sent", "corr-async-1".to_string())
        ]
    );
    assert_eq!(event_trace(&async_recorded), sync_trace);
}

#[test]
fn test_cancelled_retry_fails_through_dispatcher() {
    let provider = FakeProvider::new(Channel::Sms, "twilio", Behavior::AlwaysFail);
    let (bus, recorded) = recording_bus();
    let dispatcher = DispatcherBuilder::new()
        .register(RetryingProvider::new(provider.clone(), 5, Duration::from_secs(30)))
        .event_sink(bus)
        .build();

    let cancel = CancellationToken::new();
    let canceller = {
        let cancel = cancel.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            cancel.cancel();
        })
    };

    let err = dispatcher.send_cancellable(&sample(Channel::Sms), &cancel).unwrap_err();
    canceller.join().unwrap();

    match err {
        DispatchError::SendFailed { provider, source } => {
            assert_eq!(provider, "twilio");
            assert!(matches!(source, ProviderError::Interrupted(_)));
        }
        other => panic!("expected interrupted send, got {:?}", other),
    }
    assert_eq!(provider.calls(), 1);
    assert_eq!(kinds(&recorded), vec!["requested", "failed"]);
}

#[test]
fn test_send_handle_cancel_interrupts_async_send() {
    let provider = FakeProvider::new(Channel::Sms, "twilio", Behavior::AlwaysFail);
    let (bus, recorded) = recording_bus();
    let dispatcher = DispatcherBuilder::new()
        .register(RetryingProvider::new(provider.clone(), 5, Duration::from_secs(30)))
        .event_sink(bus)
        .build();

    let handle = dispatcher.send_async(sample(Channel::Sms));
    std::thread::sleep(Duration::from_millis(20));
    handle.cancel();
    let err = handle.blocking_join().unwrap_err();

    assert!(matches!(
        err,
        DispatchError::SendFailed {
            source: ProviderError::Interrupted(_),
            ..
        }
    ));
    assert_eq!(provider.calls(), 1);
    assert_eq!(kinds(&recorded), vec!["requested", "failed"]);
}

#[tokio::test]
async fn test_send_async_reports_same_errors() {
    let provider = FakeProvider::new(Channel::Email, "sendgrid", Behavior::AlwaysFail);
    let (bus, recorded) = recording_bus();
    let dispatcher = dispatcher_with(provider.clone(), bus);

    let invalid = Notification::email("not-an-email", "Hi", "Welcome");
    let err = dispatcher.send_async(invalid).await.unwrap_err();
    assert!(err.is_validation());
    assert!(recorded.lock().unwrap().is_empty());

    let err = dispatcher.send_async(sample(Channel::Email)).await.unwrap_err();
    assert!(matches!(err, DispatchError::SendFailed { .. }));
    assert_eq!(provider.calls(), 1);
    assert_eq!(kinds(&recorded), vec!["requested", "failed"]);
}

#[test]
fn test_send_async_outside_runtime() {
    let provider = FakeProvider::new(Channel::Push, "fcm", Behavior::Succeed);
    let dispatcher = DispatcherBuilder::new().register(provider.clone()).build();

    let result = dispatcher.send_async(sample(Channel::Push)).blocking_join().unwrap();

    assert!(result.success());
    assert_eq!(provider.calls(), 1);
}

#[test]
fn test_concurrent_sends_share_one_dispatcher() {
    let provider = FakeProvider::new(Channel::Email, "sendgrid", Behavior::Succeed);
    let (bus, recorded) = recording_bus();
    let dispatcher = dispatcher_with(provider.clone(), bus);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let dispatcher = dispatcher.clone();
            std::thread::spawn(move || {
                let n = Notification::builder(Channel::Email)
                    .recipient(Recipient::email("user@mail.com"))
                    .message(Message::email("Hi", "Welcome"))
                    .correlation_id(format!("corr-{}", i))
                    .build()
                    .unwrap();
                dispatcher.send(&n).unwrap()
            })
        })
        .collect();
    for h in handles {
        assert!(h.join().unwrap().success());
    }

    assert_eq!(provider.calls(), 8);
    let events = recorded.lock().unwrap();
    assert_eq!(events.len(), 16);
    // 同一次分发内 Requested 在终态事件之前
    for i in 0..8 {
        let id = format!("corr-{}", i);
        let own: Vec<_> = events.iter().filter(|e| e.correlation_id() == id).map(|e| e.kind()).collect();
        assert_eq!(own, vec!["requested", "sent"]);
    }
}

#[test]
fn test_configured_providers_end_to_end() {
    let config = DispatchConfig {
        sendgrid: Some(SendGridConfig {
            api_key: "SG_API_KEY".to_string(),
        }),
        twilio: Some(TwilioConfig {
            account_sid: "SID".to_string(),
            auth_token: "TOKEN".to_string(),
        }),
        fcm: Some(FcmConfig {
            service_account_json: "{service-account-json}".to_string(),
        }),
        ..Default::default()
    };
    let (bus, recorded) = recording_bus();
    let dispatcher = DispatcherBuilder::from_config(&config).unwrap().event_sink(bus).build();

    let email = dispatcher.send(&sample(Channel::Email)).unwrap();
    assert!(email.provider_message_id().unwrap().starts_with("sg-"));
    let sms = dispatcher.send(&sample(Channel::Sms)).unwrap();
    assert!(sms.provider_message_id().unwrap().starts_with("tw-"));
    let push = dispatcher.send(&sample(Channel::Push)).unwrap();
    assert!(push.provider_message_id().unwrap().starts_with("fcm-"));

    // 超长短信被 provider 拒绝，不重试
    let long_sms = Notification::sms("+521234567890", "x".repeat(2000));
    let err = dispatcher.send(&long_sms).unwrap_err();
    assert!(err.is_validation());

    assert_eq!(
        kinds(&recorded),
        vec!["requested", "sent", "requested", "sent", "requested", "sent", "requested", "failed"]
    );
}
