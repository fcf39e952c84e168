//! Simulated payment processor — the downstream collaborator.
//!
//! By the time a request reaches this, the coordinator has already decided
//! it is a genuine first execution, so there is no key or cache awareness
//! here. Validation failures come back as ordinary 400-class results, which
//! the coordinator caches exactly like successes.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::sleep;
use tracing::debug;
use uuid::Uuid;

use crate::model::OperationResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct PaymentProcessor {
    delay: Duration,
}

impl PaymentProcessor {
    /// `delay` simulates how long a real payment rail takes to settle.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Process one payment, always yielding a result (status + body).
    pub async fn process(&self, payload: &[u8]) -> OperationResult {
        let request: PaymentRequest = match serde_json::from_slice(payload) {
            Ok(request) => request,
            Err(_) => {
                return error_result(400, "invalid request body, expected {amount, currency}");
            }
        };

        if request.amount <= 0.0 || request.currency.is_empty() {
            return error_result(400, "amount must be > 0 and currency must not be empty");
        }
        if request.currency != "GHS" {
            return error_result(400, "unsupported currency, only GHS is allowed");
        }

        sleep(self.delay).await;

        let reference = Uuid::new_v4();
        debug!(%reference, amount = request.amount, "payment settled");

        let body = json!({
            "status": "success",
            "message": format!("Charged {:.2} {}", request.amount, request.currency),
            "amount": request.amount,
            "currency": request.currency,
            "reference": reference,
        });
        OperationResult::new(201, body.to_string())
    }
}

fn error_result(code: u16, message: &str) -> OperationResult {
    OperationResult::new(code, json!({ "error": message }).to_string())
}
