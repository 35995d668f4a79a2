use std::cell::Cell;
use std::fmt;
use std::time::Duration;

use quota_backoff::prelude::*;

#[derive(Debug)]
enum ClientError {
    Status(u16, String),
    Transport(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ClientError::Status(code, body) => write!(f, "HTTP {}: {}", code, body),
            ClientError::Transport(reason) => write!(f, "transport failure: {}", reason),
        }
    }
}

impl std::error::Error for ClientError {}

struct Request {
    prompt: String,
}

struct Options {
    temperature: f32,
}

fn quick_policy() -> RetryPolicy {
    RetryPolicyBuilder::default()
        .max_retries(4)
        .initial_wait(Duration::from_millis(1))
        .backoff_multiplier(2.0)
        .max_wait(Duration::from_millis(4))
        .finish()
        .unwrap()
}

#[test]
fn retries_quota_errors_with_real_sleeps() {
    let _ = pretty_env_logger::try_init();
    let calls = Cell::new(0);
    let mut client = |request: &Request, options: &Options| {
        calls.set(calls.get() + 1);
        if calls.get() < 3 {
            Err(ClientError::Status(429, "Resource has been exhausted (e.g. check quota).".into()))
        } else {
            Ok(format!("{} @ {}", request.prompt, options.temperature))
        }
    };

    let request = Request {
        prompt: "plan the analysis".into(),
    };
    let response = invoke_with_retry(&mut client, &request, &Options { temperature: 0.5 }, &quick_policy());

    assert_eq!(response.unwrap(), "plan the analysis @ 0.5");
    assert_eq!(calls.get(), 3);
}

#[test]
fn exhausted_failure_can_be_wrapped_for_the_caller() {
    let calls = Cell::new(0);
    let mut client = |_: &Request, _: &Options| -> Result<String, ClientError> {
        calls.set(calls.get() + 1);
        Err(ClientError::Status(429, "Too Many Requests".into()))
    };

    let mut sleeps = 0;
    let result = RetryingInvoker::new(quick_policy())
        .with_sleeper(|_: Duration| sleeps += 1)
        .invoke(
            &mut client,
            &Request {
                prompt: "draft report".into(),
            },
            &Options { temperature: 0.0 },
        )
        .wrap_err("report generation failed");

    let err = result.unwrap_err();
    assert_eq!(calls.get(), 5);
    assert_eq!(sleeps, 4);
    assert_eq!(err.message(), "report generation failed");
    assert_eq!(err.file(), file!());
    assert!(err.trace().contains("HTTP 429: Too Many Requests"));

    let source = err.into_source().unwrap();
    assert!(matches!(
        source.downcast_ref::<ClientError>(),
        Some(ClientError::Status(429, _))
    ));
}

#[test]
fn transport_errors_surface_untouched() {
    let mut client = |_: &Request, _: &Options| -> Result<String, ClientError> {
        Err(ClientError::Transport("connection reset".into()))
    };

    let err = RetryingInvoker::new(quick_policy())
        .with_sleeper(|_: Duration| panic!("transport errors must not back off"))
        .invoke(
            &mut client,
            &Request {
                prompt: "noop".into(),
            },
            &Options { temperature: 1.0 },
        )
        .unwrap_err();

    assert_eq!(err.to_string(), "transport failure: connection reset");
}
