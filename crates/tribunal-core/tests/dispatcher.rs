use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tribunal_core::{
    Callback, CallbackDispatcher, CallbackHandler, CallbackResponse, CaseData, CaseDetails,
    DispatchError, DispatchOptions, DispatchPriority, EventType, FailureClass, HandlerError,
    HandlerRegistry, Phase, TerminalFailure,
};

type Log = Arc<Mutex<Vec<String>>>;

enum Behaviour {
    Append(&'static str),
    Reject(&'static str),
    Warn(&'static str),
    Fail(HandlerError),
    Sleep(Duration),
    Panic,
}

struct TestHandler {
    name: &'static str,
    routes: Vec<(Phase, EventType)>,
    priority: DispatchPriority,
    behaviour: Mutex<Option<Behaviour>>,
    log: Log,
}

impl TestHandler {
    fn new(
        name: &'static str,
        routes: Vec<(Phase, EventType)>,
        behaviour: Behaviour,
        log: &Log,
    ) -> Self {
        Self {
            name,
            routes,
            priority: DispatchPriority::Late,
            behaviour: Mutex::new(Some(behaviour)),
            log: log.clone(),
        }
    }

    fn with_priority(mut self, priority: DispatchPriority) -> Self {
        self.priority = priority;
        self
    }
}

#[async_trait]
impl CallbackHandler for TestHandler {
    fn name(&self) -> &str {
        self.name
    }

    fn routes(&self) -> &[(Phase, EventType)] {
        &self.routes
    }

    fn priority(&self) -> DispatchPriority {
        self.priority
    }

    async fn handle(
        &self,
        _phase: Phase,
        callback: &Callback,
    ) -> Result<CallbackResponse, HandlerError> {
        self.log.lock().unwrap().push(self.name.to_string());
        let behaviour = self.behaviour.lock().unwrap().take();

        let mut response = CallbackResponse::new(callback.case_data().clone());
        match behaviour {
            Some(Behaviour::Append(value)) => {
                let mut trail = callback
                    .case_data()
                    .get_str("trail")
                    .unwrap_or_default()
                    .to_string();
                trail.push_str(value);
                response.data.set("trail", trail);
            }
            Some(Behaviour::Reject(msg)) => response.add_error(msg),
            Some(Behaviour::Warn(msg)) => response.add_warning(msg),
            Some(Behaviour::Fail(err)) => return Err(err),
            Some(Behaviour::Sleep(duration)) => tokio::time::sleep(duration).await,
            Some(Behaviour::Panic) => panic!("handler blew up"),
            None => {}
        }
        Ok(response)
    }
}

fn callback(event: EventType) -> Callback {
    Callback::new(
        event,
        CaseDetails::new(1234, "readyToList", CaseData::new().with("trail", "")),
    )
}

fn dispatcher(handlers: Vec<TestHandler>) -> CallbackDispatcher {
    let mut builder = HandlerRegistry::builder();
    for handler in handlers {
        builder = builder.register(Arc::new(handler));
    }
    CallbackDispatcher::new(Arc::new(builder.build().unwrap()))
}

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

const SUBMITTED_READY: (Phase, EventType) = (Phase::Submitted, EventType::ReadyToList);
const ABOUT_TO_SUBMIT_READY: (Phase, EventType) = (Phase::AboutToSubmit, EventType::ReadyToList);

#[tokio::test]
async fn test_pre_commit_single_handler_response_is_returned() {
    let log = log();
    let dispatcher = dispatcher(vec![TestHandler::new(
        "validator",
        vec![ABOUT_TO_SUBMIT_READY],
        Behaviour::Reject("Hearing route must be listAssist"),
        &log,
    )]);

    let response = dispatcher
        .dispatch(Phase::AboutToSubmit, &callback(EventType::ReadyToList))
        .await
        .unwrap();

    assert!(response.has_errors());
    assert!(response.errors.contains("Hearing route must be listAssist"));
    assert_eq!(*log.lock().unwrap(), vec!["validator"]);
}

#[tokio::test]
async fn test_pre_commit_without_handler_is_configuration_fault() {
    let log = log();
    let dispatcher = dispatcher(vec![TestHandler::new(
        "validator",
        vec![ABOUT_TO_SUBMIT_READY],
        Behaviour::Append("x"),
        &log,
    )]);

    let err = dispatcher
        .dispatch(Phase::AboutToStart, &callback(EventType::ReadyToList))
        .await
        .unwrap_err();

    assert!(err.is_configuration_fault());
    assert_eq!(err.class(), FailureClass::Configuration);
    assert!(log.lock().unwrap().is_empty());
}

struct GreedyHandler;

#[async_trait]
impl CallbackHandler for GreedyHandler {
    fn name(&self) -> &str {
        "greedy"
    }

    fn routes(&self) -> &[(Phase, EventType)] {
        &[(Phase::AboutToSubmit, EventType::SendToDwp)]
    }

    fn can_handle(&self, phase: Phase, _callback: &Callback) -> bool {
        phase == Phase::AboutToSubmit
    }

    async fn handle(
        &self,
        _phase: Phase,
        callback: &Callback,
    ) -> Result<CallbackResponse, HandlerError> {
        Ok(CallbackResponse::new(callback.case_data().clone()))
    }
}

#[tokio::test]
async fn test_pre_commit_ambiguity_is_configuration_fault() {
    let log = log();
    let registry = HandlerRegistry::builder()
        .register(Arc::new(TestHandler::new(
            "validator",
            vec![ABOUT_TO_SUBMIT_READY],
            Behaviour::Append("x"),
            &log,
        )))
        .register(Arc::new(GreedyHandler))
        .build()
        .unwrap();
    let dispatcher = CallbackDispatcher::new(Arc::new(registry));

    let err = dispatcher
        .dispatch(Phase::AboutToSubmit, &callback(EventType::ReadyToList))
        .await
        .unwrap_err();

    match err {
        DispatchError::Configuration { phase, event, message } => {
            assert_eq!(phase, Phase::AboutToSubmit);
            assert_eq!(event, EventType::ReadyToList);
            assert!(message.contains("validator"));
            assert!(message.contains("greedy"));
        }
        other => panic!("expected configuration fault, got {other:?}"),
    }
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_submitted_runs_in_priority_then_registration_order() {
    let log = log();
    let dispatcher = dispatcher(vec![
        TestHandler::new("late-1", vec![SUBMITTED_READY], Behaviour::Append("c"), &log),
        TestHandler::new("latest", vec![SUBMITTED_READY], Behaviour::Append("e"), &log)
            .with_priority(DispatchPriority::Latest),
        TestHandler::new("early", vec![SUBMITTED_READY], Behaviour::Append("b"), &log)
            .with_priority(DispatchPriority::Early),
        TestHandler::new("late-2", vec![SUBMITTED_READY], Behaviour::Append("d"), &log),
        TestHandler::new("earliest", vec![SUBMITTED_READY], Behaviour::Append("a"), &log)
            .with_priority(DispatchPriority::Earliest),
    ]);

    let response = dispatcher
        .dispatch(Phase::Submitted, &callback(EventType::ReadyToList))
        .await
        .unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["earliest", "early", "late-1", "late-2", "latest"]
    );
    // Each handler saw the previous handler's output.
    assert_eq!(response.data.get("trail"), Some(&json!("abcde")));
}

#[tokio::test]
async fn test_submitted_merges_errors_and_warnings() {
    let log = log();
    let dispatcher = dispatcher(vec![
        TestHandler::new("warns", vec![SUBMITTED_READY], Behaviour::Warn("check venue"), &log),
        TestHandler::new("rejects", vec![SUBMITTED_READY], Behaviour::Reject("no panel"), &log),
    ]);

    let response = dispatcher
        .dispatch(Phase::Submitted, &callback(EventType::ReadyToList))
        .await
        .unwrap();

    assert!(response.warnings.contains("check venue"));
    assert!(response.errors.contains("no panel"));
}

#[tokio::test]
async fn test_submitted_without_handlers_returns_data_unchanged() {
    let dispatcher = dispatcher(vec![]);
    let callback = callback(EventType::IssueFurtherEvidence);

    let response = dispatcher.dispatch(Phase::Submitted, &callback).await.unwrap();

    assert_eq!(&response.data, callback.case_data());
    assert!(response.errors.is_empty());
    assert!(response.warnings.is_empty());
}

#[tokio::test]
async fn test_submitted_failure_aborts_remaining_handlers() {
    let log = log();
    let dispatcher = dispatcher(vec![
        TestHandler::new("first", vec![SUBMITTED_READY], Behaviour::Append("a"), &log),
        TestHandler::new(
            "issuer",
            vec![SUBMITTED_READY],
            Behaviour::Fail(TerminalFailure::IssueFurtherEvidence("bulk print down".into()).into()),
            &log,
        ),
        TestHandler::new("never", vec![SUBMITTED_READY], Behaviour::Append("z"), &log),
    ]);

    let err = dispatcher
        .dispatch(Phase::Submitted, &callback(EventType::ReadyToList))
        .await
        .unwrap_err();

    assert!(err.is_terminal());
    assert!(matches!(&err, DispatchError::Handler { handler, .. } if handler == "issuer"));
    assert_eq!(*log.lock().unwrap(), vec!["first", "issuer"]);
}

#[tokio::test]
async fn test_handler_timeout() {
    let log = log();
    let registry = HandlerRegistry::builder()
        .register(Arc::new(TestHandler::new(
            "slow",
            vec![ABOUT_TO_SUBMIT_READY],
            Behaviour::Sleep(Duration::from_secs(5)),
            &log,
        )))
        .build()
        .unwrap();
    let dispatcher = CallbackDispatcher::with_options(
        Arc::new(registry),
        DispatchOptions {
            handler_timeout: Duration::from_millis(20),
        },
    );

    let err = dispatcher
        .dispatch(Phase::AboutToSubmit, &callback(EventType::ReadyToList))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DispatchError::Timeout { ref handler, timeout_ms: 20 } if handler == "slow"
    ));
    assert_eq!(err.class(), FailureClass::Transient);
}

#[tokio::test]
async fn test_handler_panic_is_contained() {
    let log = log();
    let dispatcher = dispatcher(vec![TestHandler::new(
        "panicky",
        vec![SUBMITTED_READY],
        Behaviour::Panic,
        &log,
    )]);

    let err = dispatcher
        .dispatch(Phase::Submitted, &callback(EventType::ReadyToList))
        .await
        .unwrap_err();

    match err {
        DispatchError::Handler {
            handler,
            source: HandlerError::Panicked(msg),
        } => {
            assert_eq!(handler, "panicky");
            assert!(msg.contains("handler blew up"));
        }
        other => panic!("expected panic to be reported, got {other:?}"),
    }
}
