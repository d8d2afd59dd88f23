//! Trust-line ledger.
//!
//! Verifies that a frame is authentic and fresh, then applies its mutation
//! to the addressed peer's durable state.
//!
//! # Processing a frame
//!
//! 1. Resolve the peer triple `(x_username, y_server_address, y_username)`.
//!    Unparseable names reject the frame as malformed; an unregistered
//!    relationship rejects it as an unknown peer.
//! 2. Load the relationship's shared secret.
//! 3. Recompute `SHA-256(signed_region || secret)` and compare it with the
//!    frame's tag in constant time.
//! 4. Take the peer's single-writer lock and load `last_counter`
//!    (0 if none has been stored yet).
//! 5. Reject unless `frame.counter > last_counter`.
//! 6. Parse the command argument.
//! 7. Commit `(trustline, counter)` as one atomic store operation. The stored
//!    counter becomes exactly `frame.counter`.
//! 8. Append a [`Transaction`] to the history, if a log is attached.
//!
//! Steps 4 to 7 run under the peer lock, so concurrent frames for the same
//! relationship serialize and the counter only ever moves forward.

use std::sync::Arc;

use trustline_proto::{Command, Frame};

use crate::{
    auth,
    chain::{Transaction, TransactionLog},
    env::Environment,
    error::{LedgerError, RouterError},
    locks::{PeerGuard, PeerLocks},
    peer::{PeerKey, PeerRecord, SharedSecret},
    router::{CommandRouter, LedgerAction},
    storage::PeerStore,
};

/// A frame that passed steps 1 to 5: authentic, fresh, and holding the
/// peer's lock.
struct Verified {
    peer: PeerKey,
    secret: SharedSecret,
    record: PeerRecord,
    _guard: PeerGuard,
}

/// Verification and mutation of per-peer trust-line state.
pub struct TrustlineLedger<S, E> {
    store: S,
    env: E,
    locks: PeerLocks,
    log: Option<Box<dyn TransactionLog>>,
}

impl<S: PeerStore, E: Environment> TrustlineLedger<S, E> {
    /// Create a ledger over `store`, with no transaction log attached.
    pub fn new(store: S, env: E) -> Self {
        Self { store, env, locks: PeerLocks::new(), log: None }
    }

    /// Record every accepted mutation in `log`.
    #[must_use]
    pub fn with_transaction_log(mut self, log: impl TransactionLog + 'static) -> Self {
        self.log = Some(Box::new(log));
        self
    }

    /// The underlying peer store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The attached transaction log, if any
    pub fn transaction_log(&self) -> Option<&dyn TransactionLog> {
        self.log.as_deref()
    }

    /// Register this ledger's handlers on `router`.
    ///
    /// Registers [`Command::SetTrustline`] and [`Command::GetTrustline`].
    pub fn register_handlers(self: &Arc<Self>, router: &mut CommandRouter) -> Result<(), RouterError>
    where
        S: 'static,
    {
        let ledger = Arc::clone(self);
        router.register(Command::SetTrustline, move |frame: &Frame| ledger.set_trustline(frame))?;

        let ledger = Arc::clone(self);
        router.register(Command::GetTrustline, move |frame: &Frame| ledger.get_trustline(frame))?;

        Ok(())
    }

    /// Apply a `SetTrustline` frame.
    ///
    /// The new value is a big-endian `i32` in `arguments[0..4]`; negative
    /// credit limits are rejected.
    pub fn set_trustline(&self, frame: &Frame) -> Result<Vec<LedgerAction>, LedgerError> {
        let verified = self.verify(frame)?;

        let trustline = frame.argument_i32();
        if trustline < 0 {
            return Err(LedgerError::MalformedArgument {
                peer: verified.peer,
                reason: "negative trust line",
            });
        }

        let record = PeerRecord { last_counter: frame.counter, trustline: Some(trustline) };
        self.store.commit(&verified.peer, record)?;

        tracing::info!(
            peer = %verified.peer,
            trustline,
            counter = frame.counter,
            previous = ?verified.record.trustline,
            "trust line updated"
        );

        self.record_transaction(frame, trustline);
        Ok(vec![LedgerAction::Acknowledge])
    }

    /// Answer a `GetTrustline` frame with a signed reply carrying the
    /// current value (0 if never set).
    ///
    /// The request's counter is consumed like any other, so a captured
    /// query cannot be replayed either.
    pub fn get_trustline(&self, frame: &Frame) -> Result<Vec<LedgerAction>, LedgerError> {
        let verified = self.verify(frame)?;

        let record = PeerRecord { last_counter: frame.counter, trustline: verified.record.trustline };
        self.store.commit(&verified.peer, record)?;

        let mut reply = Frame::new(Command::GetTrustline);
        reply.x_username = frame.x_username;
        reply.y_username = frame.y_username;
        reply.y_server_address = frame.y_server_address;
        reply.set_argument_i32(record.trustline.unwrap_or(0));
        reply.counter = frame.counter;
        auth::sign(&mut reply, &verified.secret);

        tracing::debug!(peer = %verified.peer, counter = frame.counter, "trust line queried");
        Ok(vec![LedgerAction::SendFrame(reply)])
    }

    fn verify(&self, frame: &Frame) -> Result<Verified, LedgerError> {
        let peer = PeerKey::from_frame(frame)?;

        let Some(secret) = self.store.load_secret(&peer)? else {
            return Err(LedgerError::UnknownPeer(peer));
        };

        if !auth::verify(frame, &secret) {
            return Err(LedgerError::SignatureMismatch(peer));
        }

        let guard = self.locks.lock(&peer);
        let record = self.store.load_record(&peer)?;

        if frame.counter <= record.last_counter {
            return Err(LedgerError::ReplayedOrStaleCounter {
                peer,
                counter: frame.counter,
                last_counter: record.last_counter,
            });
        }

        Ok(Verified { peer, secret, record, _guard: guard })
    }

    fn record_transaction(&self, frame: &Frame, trustline: i32) {
        let Some(log) = &self.log else {
            return;
        };

        let transaction = Transaction::from_frame(frame, trustline, self.env.unix_time());
        // The ledger commit is already durable; a lost history entry must not
        // undo it.
        if let Err(error) = log.append(&transaction) {
            tracing::error!(
                %error,
                counter = frame.counter,
                "failed to append transaction for committed trust-line update"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use trustline_proto::ProtocolError;

    use super::*;
    use crate::{
        chain::MemoryTransactionLog,
        storage::{MemoryStore, StorageError},
    };

    struct FixedEnv(u64);

    impl Environment for FixedEnv {
        fn unix_time(&self) -> u64 {
            self.0
        }
    }

    const SECRET: [u8; 32] = [0x5a; 32];

    fn peer() -> PeerKey {
        PeerKey::new("alice", "ripple.example.org", "bob").unwrap()
    }

    fn ledger() -> TrustlineLedger<MemoryStore, FixedEnv> {
        let store = MemoryStore::new();
        store.register_peer(&peer(), &SharedSecret::from_bytes(SECRET)).unwrap();
        TrustlineLedger::new(store, FixedEnv(1_700_000_000))
    }

    fn frame(command: Command, counter: u32, value: i32, secret: [u8; 32]) -> Frame {
        let mut frame = Frame::new(command);
        peer().address(&mut frame).unwrap();
        frame.set_argument_i32(value);
        frame.counter = counter;
        auth::sign(&mut frame, &SharedSecret::from_bytes(secret));
        frame
    }

    fn set(counter: u32, value: i32) -> Frame {
        frame(Command::SetTrustline, counter, value, SECRET)
    }

    #[test]
    fn valid_frame_updates_value_and_counter() {
        let ledger = ledger();

        let actions = ledger.set_trustline(&set(1, 500)).unwrap();
        assert_eq!(actions, vec![LedgerAction::Acknowledge]);
        assert_eq!(
            ledger.store().record(&peer()),
            Some(PeerRecord { last_counter: 1, trustline: Some(500) })
        );
    }

    #[test]
    fn counter_jumps_to_frame_counter() {
        let ledger = ledger();
        ledger.set_trustline(&set(10, 1)).unwrap();
        assert_eq!(ledger.store().record(&peer()).unwrap().last_counter, 10);
    }

    #[test]
    fn replay_is_rejected_without_change() {
        let ledger = ledger();
        let first = set(1, 500);
        ledger.set_trustline(&first).unwrap();

        let result = ledger.set_trustline(&first);
        assert!(matches!(
            result,
            Err(LedgerError::ReplayedOrStaleCounter { counter: 1, last_counter: 1, .. })
        ));

        let stale = ledger.set_trustline(&set(1, 900));
        assert!(stale.is_err());
        assert_eq!(ledger.store().record(&peer()).unwrap().trustline, Some(500));
    }

    #[test]
    fn lower_counter_is_rejected() {
        let ledger = ledger();
        ledger.set_trustline(&set(5, 1)).unwrap();
        assert!(ledger.set_trustline(&set(4, 2)).is_err());
        assert_eq!(
            ledger.store().record(&peer()),
            Some(PeerRecord { last_counter: 5, trustline: Some(1) })
        );
    }

    #[test]
    fn counter_zero_is_never_fresh() {
        let ledger = ledger();
        assert!(matches!(
            ledger.set_trustline(&set(0, 1)),
            Err(LedgerError::ReplayedOrStaleCounter { .. })
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let ledger = ledger();
        let forged = frame(Command::SetTrustline, 1, 500, [0x11; 32]);

        assert!(matches!(ledger.set_trustline(&forged), Err(LedgerError::SignatureMismatch(_))));
        assert_eq!(ledger.store().record(&peer()), Some(PeerRecord::default()));
    }

    #[test]
    fn unknown_peer_is_rejected() {
        let ledger = ledger();
        let mut stranger = set(1, 500);
        stranger.y_username = trustline_proto::TextField::new("mallory").unwrap();
        auth::sign(&mut stranger, &SharedSecret::from_bytes(SECRET));

        assert!(matches!(ledger.set_trustline(&stranger), Err(LedgerError::UnknownPeer(_))));
    }

    #[test]
    fn unparseable_name_is_malformed() {
        let ledger = ledger();
        let mut frame = set(1, 500);
        frame.x_username = trustline_proto::TextField::from_bytes([0xff; 32]);

        assert!(matches!(
            ledger.set_trustline(&frame),
            Err(LedgerError::MalformedFrame(ProtocolError::InvalidText))
        ));
    }

    #[test]
    fn negative_value_is_malformed_argument() {
        let ledger = ledger();
        let result = ledger.set_trustline(&set(1, -5));

        assert!(matches!(result, Err(LedgerError::MalformedArgument { .. })));
        assert_eq!(ledger.store().record(&peer()), Some(PeerRecord::default()));
    }

    #[test]
    fn storage_failure_is_not_a_security_rejection() {
        let ledger = ledger();
        ledger.store().set_fail_commits(true);

        let result = ledger.set_trustline(&set(1, 500));
        assert!(matches!(result, Err(LedgerError::StorageFailure(StorageError::Unavailable))));
        assert!(!result.is_err_and(|e| e.is_security_rejection()));

        // Nothing was applied, and the same frame succeeds once storage recovers
        ledger.store().set_fail_commits(false);
        assert_eq!(ledger.store().record(&peer()), Some(PeerRecord::default()));
        assert!(ledger.set_trustline(&set(1, 500)).is_ok());
    }

    #[test]
    fn accepted_updates_are_recorded() {
        let ledger = ledger().with_transaction_log(MemoryTransactionLog::new());
        ledger.set_trustline(&set(1, 500)).unwrap();
        ledger.set_trustline(&set(1, 600)).unwrap_err();
        ledger.set_trustline(&set(2, 700)).unwrap();

        let chain = ledger.transaction_log().unwrap().load().unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.get(0).unwrap().trustline, 500);
        assert_eq!(chain.get(1).unwrap().trustline, 700);
        assert_eq!(chain.get(1).unwrap().counter, 2);
        assert_eq!(chain.get(1).unwrap().timestamp, 1_700_000_000);
        assert_eq!(chain.get(1).unwrap().signature, set(2, 700).signature);
    }

    #[test]
    fn get_replies_with_signed_value_and_consumes_counter() {
        let ledger = ledger();
        ledger.set_trustline(&set(1, 500)).unwrap();

        let query = frame(Command::GetTrustline, 2, 0, SECRET);
        let actions = ledger.get_trustline(&query).unwrap();

        let [LedgerAction::SendFrame(reply)] = actions.as_slice() else {
            panic!("expected a single reply, got {actions:?}");
        };
        assert_eq!(reply.command(), Some(Command::GetTrustline));
        assert_eq!(reply.argument_i32(), 500);
        assert_eq!(reply.counter, 2);
        assert!(auth::verify(reply, &SharedSecret::from_bytes(SECRET)));

        assert_eq!(
            ledger.store().record(&peer()),
            Some(PeerRecord { last_counter: 2, trustline: Some(500) })
        );
        assert!(ledger.get_trustline(&query).is_err());
    }

    #[test]
    fn get_before_any_set_reports_zero() {
        let ledger = ledger();
        let actions = ledger.get_trustline(&frame(Command::GetTrustline, 1, 0, SECRET)).unwrap();

        let [LedgerAction::SendFrame(reply)] = actions.as_slice() else {
            panic!("expected a single reply, got {actions:?}");
        };
        assert_eq!(reply.argument_i32(), 0);
        assert_eq!(ledger.store().record(&peer()).unwrap().trustline, None);
    }

    #[test]
    fn registered_handlers_route_by_command() {
        let ledger = Arc::new(ledger());
        let mut router = CommandRouter::new();
        ledger.register_handlers(&mut router).unwrap();

        assert_eq!(router.dispatch(&set(1, 42)).unwrap(), vec![LedgerAction::Acknowledge]);
        assert!(matches!(
            router.dispatch(&frame(Command::GetTrustline, 2, 0, SECRET)).unwrap().as_slice(),
            [LedgerAction::SendFrame(_)]
        ));
        assert!(router.dispatch_datagram(&set(3, 43).to_bytes()).is_ok());
        assert_eq!(ledger.store().record(&peer()).unwrap().trustline, Some(43));
    }
}
