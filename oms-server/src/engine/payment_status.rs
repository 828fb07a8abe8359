//! Aggregate payment status policy
//!
//! Deterministic function of the order's payment set:
//!
//! 1. any payment `Paid` → `Paid`
//! 2. else any payment `Hold` → `Hold`
//! 3. else a non-empty set where every payment is `Timeout` → `Timeout`
//! 4. else → `NotPaid`
//!
//! So a single successful payment settles the order, a held payment keeps it
//! reserved, and the order only times out once every attempt has expired.

use shared::models::{Payment, PaymentStatus};

pub fn aggregate(payments: &[Payment]) -> PaymentStatus {
    if payments.iter().any(|p| p.status == PaymentStatus::Paid) {
        return PaymentStatus::Paid;
    }
    if payments.iter().any(|p| p.status == PaymentStatus::Hold) {
        return PaymentStatus::Hold;
    }
    if !payments.is_empty()
        && payments.iter().all(|p| p.status == PaymentStatus::Timeout)
    {
        return PaymentStatus::Timeout;
    }
    PaymentStatus::NotPaid
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::PaymentSystem;

    fn payment(status: PaymentStatus) -> Payment {
        let mut p = Payment::new(1, PaymentSystem::Yandex, 100.0);
        p.id = 1;
        p.status = status;
        p
    }

    #[test]
    fn empty_set_is_not_paid() {
        assert_eq!(aggregate(&[]), PaymentStatus::NotPaid);
    }

    #[test]
    fn any_paid_wins() {
        let payments = vec![
            payment(PaymentStatus::Timeout),
            payment(PaymentStatus::Paid),
            payment(PaymentStatus::Hold),
        ];
        assert_eq!(aggregate(&payments), PaymentStatus::Paid);
    }

    #[test]
    fn hold_beats_timeout_and_not_paid() {
        let payments = vec![
            payment(PaymentStatus::Timeout),
            payment(PaymentStatus::Hold),
            payment(PaymentStatus::NotPaid),
        ];
        assert_eq!(aggregate(&payments), PaymentStatus::Hold);
    }

    #[test]
    fn all_timed_out_is_timeout() {
        let payments = vec![payment(PaymentStatus::Timeout), payment(PaymentStatus::Timeout)];
        assert_eq!(aggregate(&payments), PaymentStatus::Timeout);
    }

    #[test]
    fn one_open_attempt_keeps_order_not_paid() {
        let payments = vec![payment(PaymentStatus::Timeout), payment(PaymentStatus::NotPaid)];
        assert_eq!(aggregate(&payments), PaymentStatus::NotPaid);
    }
}
