// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn attempted_then_delivered_clears_last_error() {
    let mut record = DeliveryRecord::attempted(1, "node-a", 1);
    record.mark_failed(2, "timeout");
    assert_eq!(record.last_error.as_deref(), Some("timeout"));

    record.mark_delivered(3);
    assert!(record.is_delivered());
    assert_eq!(record.last_error, None);
}

#[test]
fn exhausted_after_max_attempts() {
    let record = DeliveryRecord::attempted(1, "node-a", MAX_DELIVERY_ATTEMPTS);
    assert!(record.attempts_exhausted());
    let record = DeliveryRecord::attempted(1, "node-a", MAX_DELIVERY_ATTEMPTS - 1);
    assert!(!record.attempts_exhausted());
}
