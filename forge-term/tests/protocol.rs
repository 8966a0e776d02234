use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use forge_runtime::{
    Execution, OutputSink, OutputStream, RuntimeError, RuntimeHost, RuntimeResult, ScriptHost,
    Value,
};
use futures::FutureExt;
use forge_term::{
    ControllerConfig, ExecutionController, RunState, StartOutcome, TerminalBridge, TerminalEvent,
};
use tokio::time::timeout;

async fn within<F: Future>(future: F) -> F::Output {
    timeout(Duration::from_secs(5), future).await.expect("timed out waiting for the run")
}

async fn ready_with(config: ControllerConfig) -> ExecutionController {
    let controller =
        ExecutionController::new(Arc::new(ScriptHost::default()), TerminalBridge::default(), config);
    assert!(controller.boot().await);
    controller
}

async fn ready() -> ExecutionController {
    ready_with(ControllerConfig::default()).await
}

async fn awaiting(controller: &ExecutionController) -> RunState {
    within(controller.wait_for(|s| matches!(s, RunState::AwaitingInput(_)))).await
}

async fn settled(controller: &ExecutionController) -> RunState {
    within(controller.wait_idle()).await
}

#[tokio::test]
async fn test_boot_sequence() {
    let controller = ready().await;
    assert_eq!(controller.state(), RunState::Idle);
    assert_eq!(controller.bridge().output(), vec!["Loading runtime…", "Runtime ready."]);
}

#[tokio::test]
async fn test_script_without_input_matches_direct_execution() {
    let source = r#"
        let xs = [1, 2];
        print("A", xs);
        fn double(n) { return n * 2; }
        print(double(21));
    "#;

    let direct = ScriptHost::default();
    let chunks = Arc::new(Mutex::new(Vec::new()));
    let sink = chunks.clone();
    direct.set_output(Arc::new(move |_: OutputStream, chunk: &str| {
        sink.lock().unwrap().push(chunk.to_string());
    }));
    direct.load().await.unwrap();
    direct.execute(source).await.unwrap();

    let controller = ready().await;
    let mut events = controller.bridge().subscribe();
    assert_eq!(controller.start(source), StartOutcome::Started);
    assert_eq!(settled(&controller).await, RunState::Finished);

    assert_eq!(controller.bridge().output(), *chunks.lock().unwrap());
    while let Ok(event) = events.try_recv() {
        assert!(!matches!(event, TerminalEvent::AwaitingInput(_)));
        assert!(!matches!(event, TerminalEvent::StateChanged(RunState::AwaitingInput(_))));
    }
}

#[tokio::test]
async fn test_single_input_round_trip() {
    let controller = ready().await;
    controller.start("let x = input(\"P\"); print(\"got [\" + x + \"]\");");

    assert_eq!(awaiting(&controller).await, RunState::AwaitingInput("P".into()));
    assert_eq!(controller.bridge().prompt(), "P");
    assert_eq!(controller.bridge().output().last().map(String::as_str), Some("P"));

    assert!(controller.submit_line("X"));
    assert_eq!(controller.state(), RunState::Running);

    assert_eq!(settled(&controller).await, RunState::Finished);
    assert_eq!(controller.bridge().output(), vec!["P", "› X", "got [X]"]);
}

#[tokio::test]
async fn test_line_reaches_program_unchanged() {
    let controller = ready().await;
    controller.start("print(\"[\" + input() + \"]\");");
    assert_eq!(awaiting(&controller).await, RunState::AwaitingInput(String::new()));
    assert!(controller.bridge().output().is_empty());

    controller.submit_line("  two  words ");
    settled(&controller).await;
    assert_eq!(controller.bridge().output(), vec!["›   two  words ", "[  two  words ]"]);
}

#[tokio::test]
async fn test_output_ordering_around_input() {
    let controller = ready().await;
    controller.start("print(\"A\"); let x = input(\"P\"); print(\"B\");");
    awaiting(&controller).await;
    controller.submit_line("X");
    settled(&controller).await;
    assert_eq!(controller.bridge().output(), vec!["A", "P", "› X", "B"]);
}

#[tokio::test]
async fn test_submit_with_nothing_pending() {
    let controller = ready().await;
    let before = controller.bridge().snapshot();
    assert!(!controller.submit_line("X"));
    assert_eq!(controller.bridge().snapshot(), before);

    controller.start("print(1);");
    settled(&controller).await;
    let after_run = controller.bridge().snapshot();
    assert!(!controller.submit_line("X"));
    assert_eq!(controller.bridge().snapshot(), after_run);
}

#[tokio::test]
async fn test_clear_is_idempotent() {
    let controller = ready().await;
    controller.start("print(\"A\");");
    settled(&controller).await;

    controller.clear();
    let once = controller.bridge().snapshot();
    controller.clear();
    assert_eq!(controller.bridge().snapshot(), once);
    assert_eq!(once.state, RunState::Idle);
    assert!(once.output.is_empty());
}

#[tokio::test]
async fn test_unparsable_source_reports_diagnostic() {
    let controller = ready().await;
    controller.start("print(\"unterminated);");
    assert_eq!(settled(&controller).await, RunState::Finished);

    let output = controller.bridge().output();
    assert_eq!(output.len(), 1);
    assert!(output[0].starts_with("REWRITE_ERROR: Lex error at 1:7"), "{}", output[0]);
}

#[tokio::test]
async fn test_second_start_while_busy_is_rejected() {
    let controller = ready().await;
    controller.start("print(\"first\"); let a = input(\"P\"); print(\"first got\", a);");
    assert_eq!(controller.start("print(\"second\");"), StartOutcome::Busy);

    awaiting(&controller).await;
    let generation = controller.bridge().generation();
    assert_eq!(controller.start("print(\"second\");"), StartOutcome::Busy);
    assert_eq!(controller.bridge().generation(), generation);

    controller.submit_line("X");
    settled(&controller).await;
    assert_eq!(controller.bridge().output(), vec!["first", "P", "› X", "first got X"]);
}

#[tokio::test]
async fn test_runtime_error_fails_the_run() {
    let controller = ready().await;
    controller.start("print(\"before\"); print(missing);");
    let message = "NameError: name 'missing' is not defined".to_string();
    assert_eq!(settled(&controller).await, RunState::Failed(message.clone()));
    assert_eq!(controller.bridge().output(), vec!["before".to_string(), message]);

    assert_eq!(controller.start("print(\"again\");"), StartOutcome::Started);
    assert_eq!(settled(&controller).await, RunState::Finished);
}

#[tokio::test]
async fn test_oversized_repetition_fails_the_run() {
    let controller = ready().await;
    controller.start("print(\"A\"); let xs = [1] * 9223372036854775807; print(\"B\");");

    let state = settled(&controller).await;
    assert!(matches!(&state, RunState::Failed(m) if m.starts_with("MemoryError")), "{state:?}");
    let output = controller.bridge().output();
    assert_eq!(output.len(), 2);
    assert_eq!(output[0], "A");
}

#[tokio::test]
async fn test_restart_before_cleared_run_is_polled() {
    let controller = ready().await;
    assert_eq!(controller.start("print(\"OLD\");"), StartOutcome::Started);
    controller.clear();
    assert_eq!(controller.start("print(\"NEW\");"), StartOutcome::Started);

    assert_eq!(settled(&controller).await, RunState::Finished);
    // Let the detached run finish too
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(controller.bridge().output(), vec!["NEW"]);
    assert_eq!(controller.state(), RunState::Finished);
}

#[tokio::test]
async fn test_deeply_nested_source_reports_diagnostic() {
    let controller = ready().await;
    let source = format!("print({}1{});", "(".repeat(10_000), ")".repeat(10_000));
    assert_eq!(controller.start(&source), StartOutcome::Started);
    assert_eq!(settled(&controller).await, RunState::Finished);

    let output = controller.bridge().output();
    assert_eq!(output.len(), 1);
    assert!(output[0].starts_with("REWRITE_ERROR: Parse error"), "{}", output[0]);
}

#[tokio::test]
async fn test_clear_detaches_a_waiting_run() {
    let controller = ready().await;
    controller.start("let a = input(\"P\"); print(\"never\", a);");
    awaiting(&controller).await;

    controller.clear();
    assert_eq!(controller.state(), RunState::Idle);
    assert!(controller.bridge().prompt().is_empty());

    // Let the detached run observe the cancellation
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(controller.state(), RunState::Idle);
    assert!(controller.bridge().output().is_empty());

    assert_eq!(controller.start("print(\"fresh\");"), StartOutcome::Started);
    settled(&controller).await;
    assert_eq!(controller.bridge().output(), vec!["fresh"]);
}

#[tokio::test]
async fn test_several_inputs_in_a_loop() {
    let controller = ready().await;
    controller.start(
        r#"
        let total = 0;
        loop {
            let line = input("n? ");
            if line == "" { break; }
            total = total + int(line);
        }
        print("total", total);
        "#,
    );

    for line in ["1", "2", ""] {
        assert_eq!(awaiting(&controller).await, RunState::AwaitingInput("n? ".into()));
        assert!(controller.submit_line(line));
    }
    assert_eq!(settled(&controller).await, RunState::Finished);
    assert_eq!(
        controller.bridge().output(),
        vec!["n? ", "› 1", "n? ", "› 2", "n? ", "›", "total 3"]
    );
}

#[tokio::test]
async fn test_input_inside_functions() {
    let controller = ready().await;
    controller.start("fn ask(q) { return input(q); } print(ask(\"a?\") + ask(\"b?\"));");
    awaiting(&controller).await;
    controller.submit_line("x");
    assert_eq!(awaiting(&controller).await, RunState::AwaitingInput("b?".into()));
    controller.submit_line("y");
    settled(&controller).await;
    assert_eq!(controller.bridge().output().last().map(String::as_str), Some("xy"));
}

#[tokio::test]
async fn test_banner_is_first_chunk() {
    let config = ControllerConfig { banner: Some("$ forge run demo.fg".into()), ..Default::default() };
    let controller = ready_with(config).await;
    controller.start("print(\"hi\");");
    settled(&controller).await;
    assert_eq!(controller.bridge().output(), vec!["$ forge run demo.fg", "hi"]);
}

#[tokio::test]
async fn test_start_before_boot_is_not_ready() {
    let controller = ExecutionController::new(
        Arc::new(ScriptHost::default()),
        TerminalBridge::default(),
        ControllerConfig::default(),
    );
    assert_eq!(controller.state(), RunState::Loading);
    assert_eq!(controller.start("print(1);"), StartOutcome::NotReady);
    assert_eq!(controller.state(), RunState::Loading);
}

struct BrokenHost;

#[async_trait]
impl RuntimeHost for BrokenHost {
    async fn load(&self) -> RuntimeResult<()> {
        Err(RuntimeError::ValueError("runtime bundle missing".into()))
    }

    fn is_loaded(&self) -> bool {
        false
    }

    fn prepare(&self, _unit: &str) -> RuntimeResult<Execution> {
        Err(RuntimeError::NotLoaded)
    }

    fn set_global(&self, _name: &str, _value: Value) {}

    fn set_output(&self, _sink: OutputSink) {}
}

/// Loads fine, then blows up inside every execution
struct PanickingHost;

#[async_trait]
impl RuntimeHost for PanickingHost {
    async fn load(&self) -> RuntimeResult<()> {
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        true
    }

    fn prepare(&self, _unit: &str) -> RuntimeResult<Execution> {
        Ok(async { panic!("interpreter bug") }.boxed())
    }

    fn set_global(&self, _name: &str, _value: Value) {}

    fn set_output(&self, _sink: OutputSink) {}
}

#[tokio::test]
async fn test_panicking_run_fails_instead_of_hanging() {
    let controller = ExecutionController::new(
        Arc::new(PanickingHost),
        TerminalBridge::default(),
        ControllerConfig::default(),
    );
    assert!(controller.boot().await);
    assert_eq!(controller.start("print(1);"), StartOutcome::Started);

    let message = "InternalError: interpreter bug".to_string();
    assert_eq!(settled(&controller).await, RunState::Failed(message.clone()));
    assert_eq!(controller.bridge().output().last(), Some(&message));
    assert_eq!(controller.start("print(2);"), StartOutcome::Started);
}

#[tokio::test]
async fn test_boot_failure() {
    let controller = ExecutionController::new(
        Arc::new(BrokenHost),
        TerminalBridge::default(),
        ControllerConfig::default(),
    );
    assert!(!controller.boot().await);

    let message = "Failed to load runtime: ValueError: runtime bundle missing".to_string();
    assert_eq!(controller.state(), RunState::Failed(message.clone()));
    assert_eq!(controller.bridge().output(), vec!["Loading runtime…".to_string(), message]);
    assert_eq!(controller.start("print(1);"), StartOutcome::NotReady);
}

#[tokio::test]
async fn test_snapshot_json_transcript() {
    let controller = ready().await;
    controller.start("print(\"A\"); input(\"P\");");
    awaiting(&controller).await;

    let json: serde_json::Value =
        serde_json::from_str(&controller.bridge().snapshot().to_json().unwrap()).unwrap();
    assert_eq!(json["state"]["state"], "awaiting_input");
    assert_eq!(json["prompt"], "P");
    assert_eq!(json["output"], serde_json::json!(["A", "P"]));
    assert_eq!(json["generation"], 1);

    controller.submit_line("done");
    settled(&controller).await;
}
