//! End-to-end dispatcher scenarios driven through a mock runtime, the way
//! a real embedding delivers signals: installed hooks route failures into
//! the dispatcher, which walks the handler chain.

use cerberus::test_utils::{MockLogger, MockRuntime, RecordingHandler};
use cerberus::{
    Disposition, DispatchOutcome, ErrorHandler, ErrorHandlerConfig, ErrorLogger, ErrorOutcome,
    ExceptionInfo, LogLevel, LoggerHandler, Runtime,
};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

fn install(config: ErrorHandlerConfig) -> (Arc<ErrorHandler>, Arc<MockRuntime>) {
    let runtime = Arc::new(MockRuntime::new());
    let handler =
        ErrorHandler::install(config, runtime.clone() as Arc<dyn Runtime>).expect("install");
    (handler, runtime)
}

#[test]
fn notice_reaches_logger_with_mapped_level() {
    let (handler, runtime) = install(ErrorHandlerConfig {
        debug: false,
        ..ErrorHandlerConfig::default()
    });
    let logger = Arc::new(MockLogger::default());
    handler.add_handler(Box::new(LoggerHandler::new(
        Arc::clone(&logger) as Arc<dyn ErrorLogger>
    )));

    let outcome = runtime.deliver_error(8, "m", "f", 5, None).unwrap();
    assert_eq!(outcome, ErrorOutcome::Dispatched(DispatchOutcome::Absorbed));

    let entries = logger.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, LogLevel::Notice);
    assert!(entries[0].1.contains('m'));
    assert!(entries[0].1.contains('f'));
    assert!(entries[0].1.contains('5'));
    // Descriptor fields flattened into the bag for non-exception failures.
    assert_eq!(entries[0].2["message"], "m");
    assert_eq!(entries[0].2["line"], 5);
}

#[test]
fn stopping_handler_shields_lower_priorities() {
    let (handler, runtime) = install(ErrorHandlerConfig::default());
    let calls = Arc::new(Mutex::new(Vec::new()));
    handler.add_handler(Box::new(
        RecordingHandler::new("a", &calls)
            .with_priority(5)
            .stopping(),
    ));
    handler.add_handler(Box::new(RecordingHandler::new("b", &calls).with_priority(10)));

    let outcome = runtime.deliver_error(1, "fatal", "f", 1, None).unwrap();
    assert_eq!(outcome, ErrorOutcome::Dispatched(DispatchOutcome::Absorbed));
    assert_eq!(*calls.lock(), vec!["a"]);
}

#[test]
fn disabled_dispatcher_invokes_no_handlers() {
    let (handler, runtime) = install(ErrorHandlerConfig::default());
    let calls = Arc::new(Mutex::new(Vec::new()));
    handler.add_handler(Box::new(
        RecordingHandler::new("h", &calls).non_fatal_aware(),
    ));

    handler.disable();
    let outcome = runtime.deliver_error(1, "fatal", "f", 1, None).unwrap();
    assert_eq!(
        outcome,
        ErrorOutcome::Dispatched(DispatchOutcome::PassedThrough)
    );
    assert!(calls.lock().is_empty());
}

#[test]
fn conversion_mode_round_trips_through_exception_path() {
    let (handler, runtime) = install(ErrorHandlerConfig {
        throw_exceptions: true,
        debug: false,
        ..ErrorHandlerConfig::default()
    });
    let messages = Arc::new(Mutex::new(Vec::new()));
    {
        let messages = Arc::clone(&messages);
        handler.add_callback(
            move |message, extra| {
                let exception = extra.exception.as_ref().expect("exception slot");
                assert_eq!(
                    exception.error_context(),
                    Some(&json!({"user": 7})),
                    "structured context must survive conversion"
                );
                messages.lock().push(message.to_string());
                Disposition::Stop
            },
            false,
        );
    }

    let outcome = runtime
        .deliver_error(256, "bad", "f.rs", 9, Some(json!({"user": 7})))
        .unwrap();
    let ErrorOutcome::Raised(exception) = outcome else {
        panic!("expected conversion to a raised exception");
    };

    // Nobody caught it, so the embedder hands it to the exception hook.
    let outcome = runtime
        .deliver_exception(ExceptionInfo::from_error(exception))
        .unwrap();
    assert_eq!(outcome, DispatchOutcome::Absorbed);
    assert_eq!(
        *messages.lock(),
        vec!["ErrorException (E_USER_ERROR): bad in f.rs line 9".to_string()]
    );
}

#[test]
fn shutdown_hook_routes_unsurfaced_fatal() {
    let (handler, runtime) = install(ErrorHandlerConfig {
        debug: false,
        ..ErrorHandlerConfig::default()
    });
    let calls = Arc::new(Mutex::new(Vec::new()));
    handler.add_handler(Box::new(RecordingHandler::new("h", &calls)));

    runtime.set_last_error(1, "Allowed memory size exhausted", "big.rs", 77);
    runtime.fire_shutdown();

    assert_eq!(*calls.lock(), vec!["h"]);
    assert_eq!(runtime.cycles_collected(), 1);
}

#[test]
fn shutdown_hook_is_noop_after_uninstall() {
    let (handler, runtime) = install(ErrorHandlerConfig::default());
    let calls = Arc::new(Mutex::new(Vec::new()));
    handler.add_handler(Box::new(RecordingHandler::new("h", &calls)));

    runtime.set_last_error(1, "late", "f.rs", 1);
    handler.uninstall().unwrap();
    runtime.fire_shutdown();

    assert!(calls.lock().is_empty());
    assert_eq!(runtime.cycles_collected(), 0);
}

#[test]
fn uninstalled_dispatcher_restores_runtime_defaults() {
    let (handler, runtime) = install(ErrorHandlerConfig::default());
    handler.uninstall().unwrap();

    let outcome = runtime.deliver_error(1, "fatal", "f", 1, None).unwrap();
    assert_eq!(
        outcome,
        ErrorOutcome::Dispatched(DispatchOutcome::PassedThrough)
    );
}

#[test]
fn empty_chain_still_absorbs() {
    let (handler, runtime) = install(ErrorHandlerConfig {
        debug: false,
        ..ErrorHandlerConfig::default()
    });
    assert_eq!(handler.handler_count(), 0);

    let outcome = runtime.deliver_error(2, "w", "f", 1, None).unwrap();
    assert_eq!(outcome, ErrorOutcome::Dispatched(DispatchOutcome::Absorbed));
}
