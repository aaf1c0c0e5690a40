//! Proof composition against an in-memory relay chain.

mod common;

use std::sync::Arc;

use common::*;
use xrelay_relayer::composer::{ComposeState, ProofComposer};
use xrelay_types::signature::to_evm_compatible;
use xrelay_types::{AuditPath, RelayError, TransactionRecord, TxStatus};

// === Test Fixtures ===

fn epoch_keepers() -> Vec<xrelay_types::KeeperKey> {
    vec![keeper(1), keeper(2), p256_keeper(3)]
}

fn relay_record(epoch_start: u32) -> TransactionRecord {
    let mut record =
        TransactionRecord::detected_on_relay(SOURCE_CHAIN, DEST_CHAIN, "1111", RELAY_TX, 0, CROSS_STATES_KEY);
    record.relay_height = None;
    record.dest_epoch_start_height = epoch_start;
    record.dest_keeper_commitment = commitment(&epoch_keepers());
    record
}

fn composer(relay: MockRelay) -> (Arc<MockRelay>, ProofComposer) {
    let relay = Arc::new(relay);
    let composer = ProofComposer::new(relay.clone(), CCM);
    (relay, composer)
}

// === Scenarios ===

#[tokio::test]
async fn test_simple_relay_needs_no_anchor() {
    let relay = MockRelay::with_event(90, 80);
    relay.put_header(header(81, Some(&epoch_keepers())));
    let (relay, composer) = composer(relay);

    let record = relay_record(50);
    let composed = composer.compose(&record).await.unwrap();

    assert_eq!(composed.status, TxStatus::ProofComposed);
    assert_eq!(composed.relay_height, Some(80));
    assert!(composed.anchor_header.is_none());
    assert_eq!(composed.relay_merkle_value, Some(sample_merkle_value()));
    assert_eq!(composed.relay_header.as_ref().unwrap().height, 81);

    let bundle = composed.bundle.unwrap();
    assert!(bundle.inter_epoch_proof.is_none());
    assert!(bundle.keeper_update.is_none());
    assert_eq!(bundle.audit_path.depth(), 3);
    assert_eq!(bundle.signature_count(), 2);
    assert_eq!(
        &bundle.signatures[..65],
        &to_evm_compatible(&signature(81).0).unwrap()[..]
    );
    assert!(relay.merkle_calls.lock().unwrap().is_empty());

    // The input record is untouched.
    assert_eq!(record.status, TxStatus::Detected);
    assert!(record.bundle.is_none());
}

#[tokio::test]
async fn test_terminal_header_needs_no_anchor() {
    let relay = MockRelay::with_event(90, 80);
    relay.put_header(header(81, None));
    let (_, composer) = composer(relay);

    let composed = composer.compose(&relay_record(50)).await.unwrap();
    assert!(composed.anchor_header.is_none());
}

#[tokio::test]
async fn test_epoch_rollover_anchors_two_past_event() {
    let rotated = vec![keeper(4), keeper(2), p256_keeper(3)];
    let relay = MockRelay::with_event(90, 81);
    relay.put_header(header(82, Some(&rotated)));
    relay.put_header(header(83, None));
    let (relay, composer) = composer(relay);

    let composed = composer.compose(&relay_record(50)).await.unwrap();

    let anchor = composed.anchor_header.as_ref().unwrap();
    assert_eq!(anchor.height, 83);
    assert_eq!(*relay.merkle_calls.lock().unwrap(), vec![(82, 83)]);

    let bundle = composed.bundle.as_ref().unwrap();
    let proof = bundle.inter_epoch_proof.as_ref().unwrap();
    assert_eq!(AuditPath::decode(proof).unwrap().value, vec![82u8; 32]);
    assert_eq!(bundle.authoritative_header().height, 83);
    assert_eq!(
        &bundle.signatures[..65],
        &to_evm_compatible(&signature(83).0).unwrap()[..]
    );

    let update = bundle.keeper_update.as_ref().unwrap();
    assert_eq!(update.commitment, commitment(&rotated));
}

#[tokio::test]
async fn test_event_before_epoch_anchors_after_epoch_start() {
    let relay = MockRelay::with_event(90, 49);
    relay.put_header(header(50, None));
    relay.put_header(header(51, Some(&epoch_keepers())));
    let (relay, composer) = composer(relay);

    let composed = composer.compose(&relay_record(50)).await.unwrap();
    assert_eq!(composed.anchor_header.unwrap().height, 51);
    assert_eq!(*relay.merkle_calls.lock().unwrap(), vec![(50, 51)]);
    assert!(composed.bundle.unwrap().keeper_update.is_none());
}

#[tokio::test]
async fn test_inter_epoch_proof_spans_sealing_height() {
    let rotated = vec![keeper(4), keeper(2), p256_keeper(3)];
    let relay = MockRelay::with_event(90, 81);
    // Header served for 82 reports a different height.
    let mut sealing = header(82, Some(&rotated));
    sealing.height = 99;
    relay.headers.lock().unwrap().insert(82, sealing);
    relay.put_header(header(83, None));
    let (relay, composer) = composer(relay);

    composer.compose(&relay_record(50)).await.unwrap();
    assert_eq!(*relay.merkle_calls.lock().unwrap(), vec![(82, 83)]);
}

// === Failure classification ===

#[tokio::test]
async fn test_unsealed_height_is_proof_unavailable() {
    let relay = MockRelay::with_event(80, 80);
    let (_, composer) = composer(relay);

    let err = composer.compose(&relay_record(50)).await.unwrap_err();
    assert!(matches!(err, RelayError::ProofUnavailable(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_anchor_not_yet_produced_is_proof_unavailable() {
    let rotated = vec![keeper(4), keeper(5)];
    let relay = MockRelay::with_event(82, 81);
    relay.put_header(header(82, Some(&rotated)));
    let (_, composer) = composer(relay);

    let err = composer.compose(&relay_record(50)).await.unwrap_err();
    assert!(matches!(err, RelayError::ProofUnavailable(_)));
}

#[tokio::test]
async fn test_unknown_relay_tx_is_not_found() {
    let relay = MockRelay::with_event(90, 80);
    let (_, composer) = composer(relay);

    let mut record = relay_record(50);
    record.relay_tx_hash = Some("ffff".into());
    let err = composer.compose(&record).await.unwrap_err();
    assert!(matches!(err, RelayError::NotFound(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_missing_make_proof_is_not_found() {
    let relay = MockRelay::with_event(90, 80);
    relay.put_header(header(81, None));
    relay
        .notifications
        .lock()
        .unwrap()
        .insert(RELAY_TX.to_string(), vec![]);
    let (_, composer) = composer(relay);

    let err = composer.compose(&relay_record(50)).await.unwrap_err();
    assert!(matches!(err, RelayError::NotFound(ref msg) if msg.contains("no proof found")));
}

#[tokio::test]
async fn test_missing_configuration_fails_fast() {
    let relay = MockRelay::with_event(90, 80);
    let (relay, composer) = composer(relay);

    let err = composer.compose(&relay_record(0)).await.unwrap_err();
    assert!(matches!(err, RelayError::Configuration(_)));

    let mut no_hash = relay_record(50);
    no_hash.relay_tx_hash = None;
    assert!(matches!(
        composer.compose(&no_hash).await,
        Err(RelayError::Configuration(_))
    ));
    assert!(relay.merkle_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unsupported_keeper_key_fails_composition() {
    let relay = MockRelay::with_event(90, 80);
    let mut ids: Vec<String> = epoch_keepers()
        .iter()
        .map(|k| hex::encode(k.encode_native().unwrap()))
        .collect();
    // Ed25519 basepoint under the EdDSA key type.
    ids.push(format!("1419{}{}", "58", "66".repeat(31)));
    relay.put_header(header_with_ids(81, Some(ids)));
    let (_, composer) = composer(relay);

    let err = composer.compose(&relay_record(50)).await.unwrap_err();
    assert!(matches!(err, RelayError::UnsupportedKeyType(_)));
}

#[tokio::test]
async fn test_corrupt_cross_states_value_is_decode_error() {
    let relay = MockRelay::with_event(90, 80);
    relay.put_header(header(81, None));
    relay.cross_states.lock().unwrap().insert(
        (80, CROSS_STATES_KEY.to_string()),
        audit_path_for(vec![0xff, 0x01], 1),
    );
    let (_, composer) = composer(relay);

    let err = composer.compose(&relay_record(50)).await.unwrap_err();
    match err {
        RelayError::Decode { context, .. } => assert!(context.contains(RELAY_TX)),
        other => panic!("expected decode error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_composed_record_cannot_be_recomposed() {
    let relay = MockRelay::with_event(90, 80);
    relay.put_header(header(81, None));
    let (_, composer) = composer(relay);

    let composed = composer.compose(&relay_record(50)).await.unwrap();
    assert!(matches!(
        composer.compose(&composed).await,
        Err(RelayError::Configuration(_))
    ));
}

// === State machine ===

#[tokio::test]
async fn test_states_advance_in_order() {
    let relay = MockRelay::with_event(90, 80);
    relay.put_header(header(81, None));
    let (_, composer) = composer(relay);

    let mut state = ComposeState::NeedHeight {
        record: relay_record(50),
    };
    let mut names = vec![state.name()];
    while !matches!(state, ComposeState::BundleReady { .. }) {
        state = composer.advance(state).await.unwrap();
        names.push(state.name());
    }
    assert_eq!(
        names,
        vec!["need_height", "fetch_header", "determine_anchor", "extract_value", "bundle_ready"]
    );
}
