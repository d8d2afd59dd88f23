//! Feeds arbitrary frames through a ledger with one registered peer.
//!
//! The first input byte decides whether the frame is re-signed with the
//! peer's real secret, so mutations reach the counter and argument checks
//! instead of stopping at the tag.

#![no_main]

use libfuzzer_sys::fuzz_target;
use trustline_core::{
    CommandRouter, Environment, MemoryStore, MemoryTransactionLog, PeerKey, PeerStore,
    SharedSecret, TransactionLog, TrustlineLedger, auth,
};
use trustline_proto::Frame;

struct FixedEnv;

impl Environment for FixedEnv {
    fn unix_time(&self) -> u64 {
        1_700_000_000
    }
}

fuzz_target!(|data: &[u8]| {
    let Some((&mode, rest)) = data.split_first() else {
        return;
    };

    let peer = PeerKey::new("alice", "host", "bob").unwrap();
    let secret = SharedSecret::from_bytes([3; 32]);
    let store = MemoryStore::new();
    store.register_peer(&peer, &secret).unwrap();

    let ledger = std::sync::Arc::new(
        TrustlineLedger::new(store, FixedEnv).with_transaction_log(MemoryTransactionLog::new()),
    );
    let mut router = CommandRouter::new();
    ledger.register_handlers(&mut router).unwrap();

    let mut last_counter = 0;
    for chunk in rest.chunks(Frame::SIZE) {
        let result = match Frame::decode(chunk) {
            Ok(mut frame) if mode & 1 == 1 => {
                peer.address(&mut frame).unwrap();
                auth::sign(&mut frame, &secret);
                router.dispatch(&frame)
            },
            _ => router.dispatch_datagram(chunk),
        };

        let record = ledger.store().load_record(&peer).unwrap();
        match result {
            Ok(_) => assert!(record.last_counter > last_counter),
            Err(error) => {
                assert!(error.is_security_rejection());
                assert_eq!(record.last_counter, last_counter);
            },
        }
        last_counter = record.last_counter;
    }

    let history = ledger.transaction_log().unwrap().load().unwrap();
    assert!(history.as_slice().windows(2).all(|w| w[0].counter < w[1].counter));
});
