//! Shared value types: the response envelope, the per-call retry budget and the
//! observable outcome of a call.

use serde::Serialize;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// The top-level JSON object wrapping every server response.
///
/// ```json
/// { "status": "ok", "result": { "echo": "hello" } }
/// ```
///
/// Only a `status` of exactly [`Envelope::OK_STATUS`] carries a usable
/// `result`. Any other status is an application-level rejection; its `result`
/// is conventionally `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    /// Status discriminator. `"ok"` on success, a short human-readable reason
    /// otherwise (e.g. `"no such method"`).
    pub status: String,
    /// Procedure result. `null` when absent.
    pub result: Value,
}

impl Envelope {
    /// The status literal that marks a successful call.
    pub const OK_STATUS: &'static str = "ok";

    /// Builds a success envelope carrying `result`.
    pub fn ok(result: Value) -> Self {
        Self {
            status: Self::OK_STATUS.to_owned(),
            result,
        }
    }

    /// Builds a rejection envelope with the given status and a `null` result.
    pub fn rejected(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            result: Value::Null,
        }
    }

    /// Returns `true` if the status is exactly `"ok"`.
    pub fn is_ok(&self) -> bool {
        self.status == Self::OK_STATUS
    }

    /// Interprets an already-parsed JSON body as an envelope.
    ///
    /// Never fails: a body that parsed as JSON was delivered, so a wrong shape
    /// is an application-level rejection rather than a transport failure.
    ///
    /// - not an object, or no `status` key: status is `""`
    /// - non-string `status`: status is its JSON text (never equal to `"ok"`)
    /// - no `result` key: result is `null`
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return Self::rejected("");
        };
        let status = match fields.remove("status") {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let result = fields.remove("result").unwrap_or(Value::Null);
        Self { status, result }
    }
}

// ---------------------------------------------------------------------------
// Retry budget
// ---------------------------------------------------------------------------

/// Number of re-sends still allowed for one call after a transport failure.
///
/// Each top-level call owns a fresh budget; budgets are never shared, so one
/// call exhausting its retries has no effect on any other call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    remaining: u32,
}

impl RetryBudget {
    /// Retries granted to a call when nothing else is configured.
    pub const DEFAULT_RETRIES: u32 = 10;

    /// Creates a budget allowing `retries` re-sends after the first attempt.
    pub fn new(retries: u32) -> Self {
        Self { remaining: retries }
    }

    /// Returns the number of retries still available.
    pub fn remaining(self) -> u32 {
        self.remaining
    }

    /// Takes one retry from the budget. Returns `false`, leaving the budget
    /// untouched, if it is already exhausted.
    pub fn try_consume(&mut self) -> bool {
        if self.remaining > 0 {
            self.remaining -= 1;
            true
        } else {
            false
        }
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RETRIES)
    }
}

// ---------------------------------------------------------------------------
// Call outcome
// ---------------------------------------------------------------------------

/// How a call ended. Callers are never required to look at this; it exists so
/// a fire-and-forget call can still be observed when needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// The server answered `"ok"` and the success callback ran.
    Delivered {
        /// Total attempts, including the successful one.
        attempts: u32,
    },
    /// The server answered with a non-ok status. Not retried.
    Rejected {
        /// The status the server reported.
        status: String,
        /// Total attempts, including the rejected one.
        attempts: u32,
    },
    /// Every attempt failed at the transport level and the budget ran out.
    Exhausted {
        /// Total attempts made (first attempt plus all retries).
        attempts: u32,
    },
    /// The arguments could not be encoded as JSON; nothing was sent.
    Unsent,
}

impl CallOutcome {
    /// Number of requests actually sent.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Delivered { attempts }
            | Self::Rejected { attempts, .. }
            | Self::Exhausted { attempts } => *attempts,
            Self::Unsent => 0,
        }
    }

    /// Returns `true` if the success callback was invoked.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn ok_envelope_serialises_to_wire_shape() {
        let envelope = Envelope::ok(json!({"Echo": "hi", "Num": 42}));
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"status": "ok", "result": {"Echo": "hi", "Num": 42}})
        );
        assert!(envelope.is_ok());
    }

    #[test]
    fn rejected_envelope_has_null_result() {
        let envelope = Envelope::rejected("no such method");
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"status": "no such method", "result": null})
        );
        assert!(!envelope.is_ok());
    }

    #[rstest]
    #[case(json!({"status": "ok", "result": [1, 2]}), "ok", json!([1, 2]))]
    #[case(json!({"status": "ok"}), "ok", Value::Null)]
    #[case(json!({"status": "call error", "result": null}), "call error", Value::Null)]
    #[case(json!({"result": 3}), "", json!(3))]
    #[case(json!({"status": 1}), "1", Value::Null)]
    #[case(json!(["ok"]), "", Value::Null)]
    #[case(json!("ok"), "", Value::Null)]
    fn from_value_is_lenient(
        #[case] body: Value,
        #[case] status: &str,
        #[case] result: Value,
    ) {
        let envelope = Envelope::from_value(body);
        assert_eq!(envelope.status, status);
        assert_eq!(envelope.result, result);
    }

    #[test]
    fn only_the_exact_ok_literal_is_success() {
        assert!(!Envelope::from_value(json!({"status": "OK"})).is_ok());
        assert!(!Envelope::from_value(json!({"status": " ok"})).is_ok());
        assert!(Envelope::from_value(json!({"status": "ok"})).is_ok());
    }

    #[test]
    fn budget_counts_down_to_exhaustion() {
        let mut budget = RetryBudget::new(2);
        assert!(budget.try_consume());
        assert_eq!(budget.remaining(), 1);
        assert!(budget.try_consume());
        assert_eq!(budget.remaining(), 0);
        assert!(!budget.try_consume());
        assert_eq!(budget.remaining(), 0);
    }

    #[test]
    fn default_budget_is_ten() {
        assert_eq!(RetryBudget::default().remaining(), 10);
    }

    #[test]
    fn outcome_attempts() {
        assert_eq!(CallOutcome::Delivered { attempts: 3 }.attempts(), 3);
        assert_eq!(CallOutcome::Exhausted { attempts: 11 }.attempts(), 11);
        assert_eq!(CallOutcome::Unsent.attempts(), 0);
        assert!(!CallOutcome::Rejected { status: "x".into(), attempts: 1 }.is_delivered());
    }
}
