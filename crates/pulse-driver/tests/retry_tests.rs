use std::time::Duration;

use pulse_driver::mock::{always_fail, always_ok, Reply, ScriptedTransport};
use pulse_driver::{attempt_request, AttemptError, Outcome, RetryPolicy, TargetDescriptor};
use serde_json::json;
use tokio::time::Instant;

fn target() -> TargetDescriptor {
    TargetDescriptor::new("http://127.0.0.1:9/", "token", TargetDescriptor::default_payload()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn always_failing_target_gets_exactly_three_attempts() {
    let transport = always_fail(AttemptError::Status(500));
    let outcome = attempt_request(&transport, &target(), &RetryPolicy::default(), 0).await;
    assert_eq!(transport.calls(), 3);
    assert_eq!(outcome, Outcome::Exhausted { attempts: 3, last_error: AttemptError::Status(500) });
}

#[tokio::test(start_paused = true)]
async fn backoff_separates_failed_attempts() {
    let transport = always_fail(AttemptError::Transport("connection refused".into()));
    let policy = RetryPolicy::default();
    attempt_request(&transport, &target(), &policy, 0).await;

    let starts: Vec<Instant> = transport.attempts().into_iter().map(|(_, at)| at).collect();
    assert_eq!(starts.len(), 3);
    for pair in starts.windows(2) {
        assert!(pair[1] - pair[0] >= policy.backoff);
    }
}

#[tokio::test(start_paused = true)]
async fn recovers_after_transient_failures() {
    let transport = ScriptedTransport::new(|attempt| {
        if attempt.index < 2 { Reply::Fail(AttemptError::Status(503)) } else { Reply::Ok(json!({"result": "late"})) }
    });
    let outcome = attempt_request(&transport, &target(), &RetryPolicy::default(), 4).await;
    assert_eq!(outcome, Outcome::Success(json!({"result": "late"})));
    let indices: Vec<u32> = transport.attempts().iter().map(|(a, _)| a.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert!(transport.attempts().iter().all(|(a, _)| a.slot == 4));
}

#[tokio::test]
async fn success_makes_a_single_attempt() {
    let transport = always_ok(json!({"result": "Hello world!"}));
    let outcome = attempt_request(&transport, &target(), &RetryPolicy::default(), 0).await;
    assert!(outcome.is_success());
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn hanging_target_times_out_and_exhausts() {
    let transport = ScriptedTransport::new(|_| Reply::Hang);
    let policy = RetryPolicy { attempt_timeout: Duration::from_secs(2), ..RetryPolicy::default() };
    let start = Instant::now();
    let outcome = attempt_request(&transport, &target(), &policy, 0).await;

    assert_eq!(
        outcome,
        Outcome::Exhausted { attempts: 3, last_error: AttemptError::Timeout(Duration::from_secs(2)) }
    );
    assert_eq!(transport.calls(), 3);
    assert!(start.elapsed() >= policy.attempt_timeout * 3 + policy.backoff * 2);
    let starts: Vec<Instant> = transport.attempts().into_iter().map(|(_, at)| at).collect();
    for pair in starts.windows(2) {
        assert!(pair[1] - pair[0] >= policy.backoff);
    }
}

#[tokio::test(start_paused = true)]
async fn zero_max_attempts_still_makes_one_call() {
    let transport = always_fail(AttemptError::Status(502));
    let policy = RetryPolicy { max_attempts: 0, ..RetryPolicy::default() };
    let outcome = attempt_request(&transport, &target(), &policy, 0).await;
    assert_eq!(transport.calls(), 1);
    assert!(matches!(outcome, Outcome::Exhausted { attempts: 1, .. }));
}
