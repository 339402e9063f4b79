//! Razorpay signature verification.
//!
//! Razorpay signs three things with HMAC-SHA256, hex-encoded:
//!
//! | What | Message | Secret |
//! |------|---------|--------|
//! | Order checkout | `order_id + "|" + payment_id` | key secret |
//! | Subscription checkout | `payment_id + "|" + subscription_id` | key secret |
//! | Webhook delivery | raw request body | webhook secret |
//!
//! Every check here fails closed: an empty secret, a signature that is not
//! hex, or one of the wrong length is simply "not verified".

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Length in bytes of an HMAC-SHA256 digest.
const DIGEST_LEN: usize = 32;

/// Verifies the signature returned by checkout for a one-time order.
pub fn verify_payment_confirmation(
    order_id: &str,
    payment_id: &str,
    signature: &str,
    secret: &str,
) -> bool {
    let message = format!("{}|{}", order_id, payment_id);
    verify(message.as_bytes(), signature, secret)
}

/// Verifies the signature returned by checkout for a subscription.
///
/// Razorpay puts the payment id first for subscriptions.
pub fn verify_subscription_confirmation(
    subscription_id: &str,
    payment_id: &str,
    signature: &str,
    secret: &str,
) -> bool {
    let message = format!("{}|{}", payment_id, subscription_id);
    verify(message.as_bytes(), signature, secret)
}

/// Verifies an `x-razorpay-signature` header against the exact request bytes.
pub fn verify_webhook_signature(raw_body: &[u8], signature: &str, secret: &str) -> bool {
    verify(raw_body, signature, secret)
}

/// Computes the hex HMAC-SHA256 of `message` under `secret`.
///
/// Returns `None` only for an empty secret.
pub fn sign(message: &[u8], secret: &str) -> Option<String> {
    compute(message, secret).map(hex::encode)
}

fn verify(message: &[u8], signature: &str, secret: &str) -> bool {
    let Some(expected) = compute(message, secret) else {
        return false;
    };

    let provided = match hex::decode(signature.trim()) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    constant_time_compare(&expected, &provided)
}

fn compute(message: &[u8], secret: &str) -> Option<Vec<u8>> {
    if secret.is_empty() {
        return None;
    }
    // HMAC accepts keys of any length; the error arm is unreachable in practice.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(message);
    Some(mac.finalize().into_bytes().to_vec())
}

/// Constant-time comparison to prevent timing attacks.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != DIGEST_LEN || b.len() != DIGEST_LEN {
        return false;
    }
    a.ct_eq(b).into()
}
