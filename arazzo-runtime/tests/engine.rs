use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arazzo_model::WorkflowDocument;
use arazzo_runtime::{
    Engine, EngineConfig, EngineError, Event, EventSink, ExpressionCache, StepRequest,
    TransactionSnapshot, Transport, TransportError, TransportStepExecutor,
};
use async_trait::async_trait;
use serde_json::json;

/// Replays canned responses per step; unscripted steps answer `200` with no body.
#[derive(Clone, Default)]
struct ScriptedTransport {
    responses: Arc<Mutex<BTreeMap<String, VecDeque<TransactionSnapshot>>>>,
    requests: Arc<Mutex<Vec<StepRequest>>>,
}

impl ScriptedTransport {
    fn respond(&self, step_id: &str, snapshots: impl IntoIterator<Item = TransactionSnapshot>) {
        self.responses
            .lock()
            .unwrap()
            .entry(step_id.to_string())
            .or_default()
            .extend(snapshots);
    }

    fn calls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.step_id.clone())
            .collect()
    }

    fn request(&self, step_id: &str) -> StepRequest {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.step_id == step_id)
            .cloned()
            .unwrap()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: StepRequest) -> Result<TransactionSnapshot, TransportError> {
        let scripted = self
            .responses
            .lock()
            .unwrap()
            .get_mut(&request.step_id)
            .and_then(VecDeque::pop_front);
        self.requests.lock().unwrap().push(request);
        Ok(scripted.unwrap_or_else(|| status(200)))
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn emit(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

fn status(code: u16) -> TransactionSnapshot {
    TransactionSnapshot::new("POST", "https://api.example.com/op", code)
}

fn json_body(code: u16, body: &str) -> TransactionSnapshot {
    status(code).with_response_body("application/json", body)
}

fn document(yaml: &str) -> WorkflowDocument {
    serde_yaml::from_str(yaml).unwrap()
}

fn engine<'d>(doc: &'d WorkflowDocument, transport: &ScriptedTransport) -> Engine<'d> {
    Engine::new(
        doc,
        Arc::new(TransportStepExecutor::new(transport.clone())),
        EngineConfig::default(),
    )
}

#[tokio::test]
async fn goto_skips_intermediate_steps() {
    let doc = document(
        r#"
workflows:
  - workflowId: flow
    steps:
      - stepId: a
        operationId: opA
        onSuccess:
          - name: skip
            type: goto
            stepId: c
      - stepId: b
        operationId: opB
      - stepId: c
        operationId: opC
"#,
    );
    let transport = ScriptedTransport::default();

    let report = engine(&doc, &transport)
        .execute_workflow("flow", json!({}))
        .await
        .unwrap();

    assert_eq!(transport.calls(), vec!["a", "c"]);
    assert_eq!(report.steps_executed, 2);
}

#[tokio::test(start_paused = true)]
async fn retry_limit_is_fatal_once_exceeded() {
    let doc = document(
        r#"
workflows:
  - workflowId: pay
    steps:
      - stepId: charge
        operationId: charge
        successCriteria:
          - condition: $statusCode == 200
        onFailure:
          - name: again
            type: retry
            retryAfter: 1
            retryLimit: 2
"#,
    );
    let transport = ScriptedTransport::default();
    transport.respond("charge", [status(503), status(503), status(503)]);
    let sink = Arc::new(RecordingSink::default());

    let err = engine(&doc, &transport)
        .with_event_sink(sink.clone())
        .execute_workflow("pay", json!({}))
        .await
        .unwrap_err();

    assert!(
        matches!(err, EngineError::RetryLimitReached { limit: 2, ref step_id, .. } if step_id == "charge"),
        "{err:?}"
    );
    assert_eq!(transport.calls(), vec!["charge", "charge", "charge"]);
    let attempts: Vec<u32> = sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::RetryScheduled { attempt, .. } => Some(attempt),
            _ => None,
        })
        .collect();
    assert_eq!(attempts, vec![1, 2]);
}

#[tokio::test(start_paused = true)]
async fn retry_counter_survives_a_success() {
    let doc = document(
        r#"
workflows:
  - workflowId: poll
    steps:
      - stepId: fetch
        operationId: fetch
        successCriteria:
          - condition: $statusCode == 200
        onFailure:
          - name: again
            type: retry
            retryLimit: 1
      - stepId: check
        operationId: check
        onSuccess:
          - name: loop
            type: goto
            stepId: fetch
"#,
    );
    let transport = ScriptedTransport::default();
    transport.respond("fetch", [status(500), status(200), status(500)]);

    let err = engine(&doc, &transport)
        .execute_workflow("poll", json!({}))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::RetryLimitReached { limit: 1, .. }), "{err:?}");
    assert_eq!(transport.calls(), vec!["fetch", "fetch", "check", "fetch"]);
}

#[tokio::test]
async fn polling_loop_sees_each_republished_output() {
    let doc = document(
        r#"
workflows:
  - workflowId: wait
    outputs:
      state: $steps.poll.outputs.body.state
    steps:
      - stepId: poll
        operationId: getJob
        successCriteria:
          - condition: $statusCode == 200
        outputs:
          body: $response.body
        onSuccess:
          - name: stillPending
            type: goto
            stepId: poll
            criteria:
              - condition: $steps.poll.outputs.body.state == pending
          - name: finished
            type: end
"#,
    );
    let transport = ScriptedTransport::default();
    transport.respond(
        "poll",
        [
            json_body(200, r#"{"state": "pending"}"#),
            json_body(200, r#"{"state": "pending"}"#),
            json_body(200, r#"{"state": "done"}"#),
        ],
    );

    let report = engine(&doc, &transport)
        .execute_workflow("wait", json!({}))
        .await
        .unwrap();

    assert_eq!(transport.calls(), vec!["poll", "poll", "poll"]);
    assert_eq!(report.outputs["state"], "done");
}

#[tokio::test]
async fn failure_without_any_action_aborts() {
    let doc = document(
        r#"
workflows:
  - workflowId: flow
    steps:
      - stepId: a
        operationId: opA
        successCriteria:
          - condition: $statusCode == 200
      - stepId: b
        operationId: opB
"#,
    );
    let transport = ScriptedTransport::default();
    transport.respond("a", [status(404)]);

    let err = engine(&doc, &transport)
        .execute_workflow("flow", json!({}))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::NoFailureAction { ref step_id, .. } if step_id == "a"));
    assert_eq!(transport.calls(), vec!["a"]);
}

#[tokio::test]
async fn end_on_failure_still_resolves_outputs() {
    let doc = document(
        r#"
workflows:
  - workflowId: flow
    outputs:
      user: $inputs.user
    steps:
      - stepId: a
        operationId: opA
        successCriteria:
          - condition: $statusCode == 200
        onFailure:
          - name: stop
            type: end
      - stepId: b
        operationId: opB
"#,
    );
    let transport = ScriptedTransport::default();
    transport.respond("a", [status(500)]);

    let report = engine(&doc, &transport)
        .execute_workflow("flow", json!({"user": "ana"}))
        .await
        .unwrap();

    assert_eq!(transport.calls(), vec!["a"]);
    assert_eq!(report.outputs.get("user").map(String::as_str), Some("ana"));
}

#[tokio::test]
async fn workflow_failure_actions_take_precedence() {
    let doc = document(
        r#"
workflows:
  - workflowId: flow
    failureActions:
      - name: giveUp
        type: end
    steps:
      - stepId: a
        operationId: opA
        successCriteria:
          - condition: $statusCode == 200
        onFailure:
          - name: again
            type: retry
            retryLimit: 5
"#,
    );
    let transport = ScriptedTransport::default();
    transport.respond("a", [status(500)]);

    let report = engine(&doc, &transport)
        .execute_workflow("flow", json!({}))
        .await
        .unwrap();

    assert_eq!(transport.calls(), vec!["a"]);
    assert_eq!(report.retries, 0);
}

#[tokio::test]
async fn step_action_criteria_must_match_something() {
    let doc = document(
        r#"
workflows:
  - workflowId: flow
    steps:
      - stepId: a
        operationId: opA
        onSuccess:
          - name: onlyWhenCreated
            type: end
            criteria:
              - condition: $statusCode == 201
"#,
    );
    let transport = ScriptedTransport::default();

    let err = engine(&doc, &transport)
        .execute_workflow("flow", json!({}))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::ActionCriteriaExhausted { .. }), "{err:?}");
}

#[tokio::test]
async fn goto_unknown_step_is_a_lookup_error() {
    let doc = document(
        r#"
workflows:
  - workflowId: flow
    steps:
      - stepId: a
        operationId: opA
        onSuccess:
          - name: jump
            type: goto
            stepId: nowhere
"#,
    );
    let transport = ScriptedTransport::default();

    let err = engine(&doc, &transport)
        .execute_workflow("flow", json!({}))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::UnknownStep { ref step_id, .. } if step_id == "nowhere"));
}

#[tokio::test(start_paused = true)]
async fn retry_hook_runs_before_the_retry() {
    let doc = document(
        r#"
workflows:
  - workflowId: flow
    steps:
      - stepId: pay
        operationId: pay
        successCriteria:
          - condition: $statusCode == 200
        onSuccess:
          - name: done
            type: end
        onFailure:
          - name: refreshFirst
            type: retry
            stepId: refresh
            retryLimit: 1
      - stepId: refresh
        operationId: refreshToken
        onSuccess:
          - name: wouldEnd
            type: end
"#,
    );
    let transport = ScriptedTransport::default();
    transport.respond("pay", [status(401), status(200)]);

    let report = engine(&doc, &transport)
        .execute_workflow("flow", json!({}))
        .await
        .unwrap();

    assert_eq!(transport.calls(), vec!["pay", "refresh", "pay"]);
    assert_eq!(report.retries, 1);
}

#[tokio::test(start_paused = true)]
async fn retry_after_header_overrides_declared_wait() {
    let doc = document(
        r#"
workflows:
  - workflowId: flow
    steps:
      - stepId: pay
        operationId: pay
        successCriteria:
          - condition: $statusCode == 200
        onFailure:
          - name: again
            type: retry
            retryAfter: 1
            retryLimit: 1
"#,
    );
    let transport = ScriptedTransport::default();
    transport.respond(
        "pay",
        [status(429).with_response_header("Retry-After", "120"), status(200)],
    );

    let started = tokio::time::Instant::now();
    engine(&doc, &transport)
        .execute_workflow("flow", json!({}))
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_secs(120));
}

#[tokio::test]
async fn outputs_are_visible_to_later_workflows() {
    let doc = document(
        r#"
workflows:
  - workflowId: report
    dependsOn: [sum]
    outputs:
      echoed: $steps.notify.outputs.total
    steps:
      - stepId: notify
        operationId: notify
        parameters:
          - name: total
            in: query
            value: $workflows.sum.outputs.total
        outputs:
          total: $workflows.sum.outputs.total
  - workflowId: sum
    outputs:
      total: "{$steps.add.outputs.result}"
    steps:
      - stepId: add
        operationId: add
        successCriteria:
          - condition: $statusCode == 200
        outputs:
          result: $response.body#/result
"#,
    );
    let transport = ScriptedTransport::default();
    transport.respond("add", [json_body(200, r#"{"result": 42}"#)]);

    let reports = engine(&doc, &transport)
        .execute_document(&BTreeMap::new())
        .await
        .unwrap();

    let order: Vec<&str> = reports.iter().map(|r| r.workflow_id.as_str()).collect();
    assert_eq!(order, vec!["sum", "report"]);
    assert_eq!(reports[0].outputs["total"], "42");
    assert_eq!(reports[1].outputs["echoed"], "42");
    assert_eq!(transport.request("notify").parameter("total"), Some(&json!("42")));
}

#[tokio::test]
async fn caller_owned_cache_chains_runs() {
    let doc = document(
        r#"
workflows:
  - workflowId: first
    outputs:
      id: $inputs.id
    steps:
      - stepId: noop
        operationId: noop
"#,
    );
    let transport = ScriptedTransport::default();
    let engine = engine(&doc, &transport);
    let mut cache = ExpressionCache::new();

    engine
        .execute_workflow_with_cache("first", json!({"id": 9}), &mut cache)
        .await
        .unwrap();

    assert_eq!(cache.get("$workflows.first.outputs.id"), Some(&json!("9")));
}

#[tokio::test]
async fn delegation_runs_the_nested_workflow_with_step_parameters() {
    let doc = document(
        r#"
workflows:
  - workflowId: checkout
    steps:
      - stepId: login
        workflowId: auth
        parameters:
          - name: user
            value: $inputs.user
      - stepId: pay
        operationId: pay
        parameters:
          - name: Authorization
            in: header
            value: "Bearer {$workflows.auth.outputs.token}"
  - workflowId: auth
    outputs:
      token: $steps.issue.outputs.value
    steps:
      - stepId: issue
        operationId: issueToken
        parameters:
          - name: username
            in: query
            value: $inputs.user
        successCriteria:
          - condition: $statusCode == 200
        outputs:
          value: $response.body#/token
"#,
    );
    let transport = ScriptedTransport::default();
    transport.respond("issue", [json_body(200, r#"{"token": "t-1"}"#)]);
    let sink = Arc::new(RecordingSink::default());

    let report = engine(&doc, &transport)
        .with_event_sink(sink.clone())
        .execute_workflow("checkout", json!({"user": "ana"}))
        .await
        .unwrap();

    assert_eq!(transport.calls(), vec!["issue", "pay"]);
    assert_eq!(transport.request("issue").parameter("username"), Some(&json!("ana")));
    assert_eq!(
        transport.request("pay").parameter("Authorization"),
        Some(&json!("Bearer t-1"))
    );

    let events = sink.events();
    assert!(events.iter().any(|e| matches!(
        e,
        Event::WorkflowDelegated { step_id, workflow_id, .. } if step_id == "login" && workflow_id == "auth"
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        Event::RunStarted { workflow_id, parent_run_id: Some(parent), .. }
            if workflow_id == "auth" && *parent == report.run_id
    )));
}

#[tokio::test]
async fn goto_workflow_ends_the_current_run() {
    let doc = document(
        r#"
workflows:
  - workflowId: main
    steps:
      - stepId: a
        operationId: opA
        onSuccess:
          - name: handOff
            type: goto
            workflowId: other
      - stepId: b
        operationId: opB
  - workflowId: other
    steps:
      - stepId: x
        operationId: opX
"#,
    );
    let transport = ScriptedTransport::default();

    engine(&doc, &transport)
        .execute_workflow("main", json!({}))
        .await
        .unwrap();

    assert_eq!(transport.calls(), vec!["a", "x"]);
}

#[tokio::test]
async fn runaway_delegation_is_bounded() {
    let doc = document(
        r#"
workflows:
  - workflowId: again
    steps:
      - stepId: recurse
        workflowId: again
"#,
    );
    let transport = ScriptedTransport::default();
    let config = EngineConfig {
        max_delegation_depth: 3,
        ..EngineConfig::default()
    };
    let engine = Engine::new(
        &doc,
        Arc::new(TransportStepExecutor::new(transport.clone())),
        config,
    );

    let err = engine.execute_workflow("again", json!({})).await.unwrap_err();
    assert!(matches!(err, EngineError::DelegationDepth { limit: 3, .. }), "{err:?}");
}

#[tokio::test]
async fn unknown_workflow_is_rejected() {
    let doc = WorkflowDocument::default();
    let transport = ScriptedTransport::default();

    let err = engine(&doc, &transport)
        .execute_workflow("missing", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownWorkflow(ref id) if id == "missing"));
}

#[tokio::test]
async fn run_emits_lifecycle_events_in_order() {
    let doc = document(
        r#"
workflows:
  - workflowId: flow
    steps:
      - stepId: a
        operationId: opA
"#,
    );
    let transport = ScriptedTransport::default();
    let sink = Arc::new(RecordingSink::default());

    engine(&doc, &transport)
        .with_event_sink(sink.clone())
        .execute_workflow("flow", json!({}))
        .await
        .unwrap();

    let kinds: Vec<&str> = sink
        .events()
        .iter()
        .map(|e| match e {
            Event::RunStarted { .. } => "run-started",
            Event::StepStarted { .. } => "step-started",
            Event::StepSucceeded { .. } => "step-succeeded",
            Event::RunFinished { succeeded: true, .. } => "run-finished",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["run-started", "step-started", "step-succeeded", "run-finished"]);
}
