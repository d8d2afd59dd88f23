//! Frame authentication.
//!
//! The tag is `SHA-256(signed_region || secret)` where the signed region is
//! every frame byte before the signature field. Both peers hold the same
//! secret, so the same function signs outbound frames and checks inbound
//! ones.

use sha2::{Digest, Sha256};
use trustline_proto::{Frame, frame::SIGNATURE_SIZE};

use crate::peer::SharedSecret;

/// Compute the tag a frame should carry under `secret`.
pub fn compute_signature(frame: &Frame, secret: &SharedSecret) -> [u8; SIGNATURE_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(frame.signed_region());
    hasher.update(secret.as_bytes());
    hasher.finalize().into()
}

/// Fill in `frame.signature` for the current frame contents.
pub fn sign(frame: &mut Frame, secret: &SharedSecret) {
    frame.signature = compute_signature(frame, secret);
}

/// Check a frame's tag without leaking how many leading bytes matched.
pub fn verify(frame: &Frame, secret: &SharedSecret) -> bool {
    constant_time_eq(&compute_signature(frame, secret), &frame.signature)
}

fn constant_time_eq(a: &[u8; SIGNATURE_SIZE], b: &[u8; SIGNATURE_SIZE]) -> bool {
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    std::hint::black_box(diff) == 0
}
