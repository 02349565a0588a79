//! Bounded retry-until-valid loop over generate → parse.
//!
//! Attempts run strictly one after another with the same prompt. Only an
//! invalid parse triggers another attempt; an error ends the loop at once
//! unless [`RefactorError::is_retryable`] says otherwise.
//! A deadline or cancellation token aborts the attempt in flight.

use std::future::Future;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::dispatch::{Generate, RawGeneration};
use crate::error::RefactorError;
use crate::parsers::{ParseTier, ParsedResult, ResponseParser};

/// One generate → parse cycle.
#[derive(Debug, Clone)]
pub struct AttemptLog {
    /// 1-based, strictly increasing.
    pub attempt: u32,
    pub raw: RawGeneration,
    pub parsed: ParsedResult,
    pub tier: ParseTier,
    pub valid: bool,
}

/// Every attempt made; `last` is the valid one or the final exhausted one.
#[derive(Debug, Clone)]
pub struct RetryOutcome {
    pub previous: Vec<AttemptLog>,
    pub last: AttemptLog,
}

impl RetryOutcome {
    pub fn attempts_used(&self) -> u32 {
        self.last.attempt
    }

    pub fn is_valid(&self) -> bool {
        self.last.valid
    }

    pub fn attempts(&self) -> impl Iterator<Item = &AttemptLog> {
        self.previous.iter().chain(std::iter::once(&self.last))
    }

    /// Sum of backend round-trip times over all attempts.
    pub fn total_elapsed_ns(&self) -> u64 {
        self.attempts()
            .fold(0u64, |acc, a| acc.saturating_add(a.raw.elapsed_ns))
    }
}

#[derive(Debug, Clone)]
pub struct RetryController {
    max_attempts: u32,
    deadline: Option<Instant>,
    cancellation_token: Option<CancellationToken>,
}

impl RetryController {
    /// `max_attempts` below 1 is treated as 1.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            deadline: None,
            cancellation_token: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub async fn run<G: Generate>(
        &self,
        generator: &G,
        parser: &ResponseParser,
        prompt: &str,
    ) -> Result<RetryOutcome, RefactorError> {
        let start = Instant::now();
        let mut previous = Vec::new();
        let mut attempt = 1;

        loop {
            let raw = match self.guard(generator.generate(prompt), start).await {
                Ok(raw) => raw,
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    tracing::warn!(attempt, max = self.max_attempts, "retrying after error: {e}");
                    attempt += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };
            let (parsed, tier) = parser.parse_with_tier(&raw.text);
            let valid = parsed.is_valid();
            let log = AttemptLog {
                attempt,
                raw,
                parsed,
                tier,
                valid,
            };

            if valid {
                tracing::debug!(attempt, ?tier, "attempt produced a valid result");
                return Ok(RetryOutcome { previous, last: log });
            }
            if attempt >= self.max_attempts {
                tracing::warn!(
                    attempts = attempt,
                    "no valid result after {attempt} attempt(s), returning last"
                );
                return Ok(RetryOutcome { previous, last: log });
            }

            tracing::warn!(attempt, max = self.max_attempts, ?tier, "invalid result, retrying");
            previous.push(log);
            attempt += 1;
        }
    }

    /// Race one attempt against the deadline and the cancellation token.
    async fn guard<F>(&self, call: F, start: Instant) -> Result<RawGeneration, RefactorError>
    where
        F: Future<Output = Result<RawGeneration, RefactorError>>,
    {
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
                None => std::future::pending().await,
            }
        };
        let cancelled = async {
            match &self.cancellation_token {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };
        let elapsed_ms = || u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        tokio::select! {
            biased;
            _ = cancelled => Err(RefactorError::Cancelled(elapsed_ms())),
            _ = expired => Err(RefactorError::Timeout(elapsed_ms())),
            result = call => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;

    const VALID: &str = "**SRP**\n```java\nclass A {}\n```\nSplit it.";
    const INVALID: &str = "I think this code looks fine overall.";

    /// Returns scripted texts in order, repeating the last one.
    struct Scripted {
        texts: Vec<&'static str>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(texts: Vec<&'static str>) -> Self {
            Self {
                texts,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Generate for Scripted {
        async fn generate(&self, _prompt: &str) -> Result<RawGeneration, RefactorError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            let text = self.texts[n.min(self.texts.len() - 1)];
            Ok(RawGeneration {
                text: text.to_string(),
                elapsed_ns: 1_000,
            })
        }
    }

    struct Failing {
        calls: AtomicU32,
    }

    impl Generate for Failing {
        async fn generate(&self, _prompt: &str) -> Result<RawGeneration, RefactorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(RefactorError::BackendRejected {
                backend: "local".into(),
                status: 429,
                body: "slow down".into(),
            })
        }
    }

    struct Slow {
        prompts: Mutex<Vec<String>>,
    }

    impl Generate for Slow {
        async fn generate(&self, prompt: &str) -> Result<RawGeneration, RefactorError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(RawGeneration {
                text: VALID.to_string(),
                elapsed_ns: 0,
            })
        }
    }

    #[tokio::test]
    async fn always_invalid_uses_exactly_max_attempts() {
        for max in [1, 3, 5] {
            let generator = Scripted::new(vec![INVALID]);
            let outcome = RetryController::new(max)
                .run(&generator, &ResponseParser::new(), "p")
                .await
                .unwrap();
            assert_eq!(generator.calls(), max);
            assert_eq!(outcome.attempts_used(), max);
            assert!(!outcome.is_valid());
            assert_eq!(outcome.last.parsed.explanation.as_deref(), Some(INVALID));
        }
    }

    #[tokio::test]
    async fn stops_at_first_valid_attempt() {
        let generator = Scripted::new(vec![INVALID, VALID, INVALID]);
        let outcome = RetryController::new(5)
            .run(&generator, &ResponseParser::for_language("java"), "p")
            .await
            .unwrap();
        assert_eq!(generator.calls(), 2);
        assert!(outcome.is_valid());
        assert_eq!(outcome.attempts_used(), 2);
        assert_eq!(outcome.last.parsed.violation_type.as_deref(), Some("SRP"));
    }

    #[tokio::test]
    async fn attempt_indices_are_one_based_and_increasing() {
        let generator = Scripted::new(vec![INVALID]);
        let outcome = RetryController::new(4)
            .run(&generator, &ResponseParser::new(), "p")
            .await
            .unwrap();
        let indices: Vec<u32> = outcome.attempts().map(|a| a.attempt).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
        assert_eq!(outcome.total_elapsed_ns(), 4_000);
    }

    #[tokio::test]
    async fn zero_max_attempts_still_makes_one_call() {
        let generator = Scripted::new(vec![INVALID]);
        let controller = RetryController::new(0);
        assert_eq!(controller.max_attempts(), 1);
        controller
            .run(&generator, &ResponseParser::new(), "p")
            .await
            .unwrap();
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn backend_errors_are_not_retried() {
        let generator = Failing {
            calls: AtomicU32::new(0),
        };
        let err = RetryController::new(5)
            .run(&generator, &ResponseParser::new(), "p")
            .await
            .unwrap_err();
        assert!(matches!(err, RefactorError::BackendRejected { status: 429, .. }));
        assert!(!err.is_retryable());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn deadline_aborts_attempt_in_flight() {
        let generator = Slow {
            prompts: Mutex::new(Vec::new()),
        };
        let started = Instant::now();
        let err = RetryController::new(3)
            .with_deadline(Instant::now() + Duration::from_millis(100))
            .run(&generator, &ResponseParser::new(), "same prompt")
            .await
            .unwrap_err();
        assert!(matches!(err, RefactorError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(*generator.prompts.lock().unwrap(), vec!["same prompt".to_string()]);
    }

    #[tokio::test]
    async fn cancellation_aborts_attempt_in_flight() {
        let generator = Slow {
            prompts: Mutex::new(Vec::new()),
        };
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });
        let err = RetryController::new(1)
            .with_cancellation(token)
            .run(&generator, &ResponseParser::new(), "p")
            .await
            .unwrap_err();
        assert!(matches!(err, RefactorError::Cancelled(_)));
    }

    #[test]
    fn pre_cancelled_token_skips_generation() {
        let generator = Scripted::new(vec![VALID]);
        let token = CancellationToken::new();
        token.cancel();
        let err = tokio_test::block_on(
            RetryController::new(3)
                .with_cancellation(token)
                .run(&generator, &ResponseParser::new(), "p"),
        )
        .unwrap_err();
        assert!(matches!(err, RefactorError::Cancelled(_)));
        assert_eq!(generator.calls(), 0);
    }
}
