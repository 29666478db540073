//! Session handler behavior over in-memory streams.
//!
//! Each test writes one frame into a duplex pipe, runs the session on the
//! server half, and reads back whatever the server wrote before closing.

use std::sync::{
    Arc, LazyLock,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use fieldwire_client::Composer;
use fieldwire_core::{
    MemoryKeyRegistry, MemoryTelemetryStore, RecordId, ResolveError, StorageError, TelemetrySink,
};
use fieldwire_crypto::{CryptoError, DevicePrivateKey, SharedSecret, derive_forge_hash};
use fieldwire_proto::{
    ACK, DeviceIdentity, EnvelopeBody, Frame, FrameHeader, FrameType, ProtocolError,
    TelemetryPayload,
};
use fieldwire_server::{DispatchTable, Outcome, Session, SessionConfig, SessionError};
use proptest::prelude::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

static DEVICE_KEY: LazyLock<DevicePrivateKey> =
    LazyLock::new(|| DevicePrivateKey::generate().unwrap());
static ROGUE_KEY: LazyLock<DevicePrivateKey> =
    LazyLock::new(|| DevicePrivateKey::generate().unwrap());

const SECRET: [u8; 32] = [0x42; 32];
const DEVICE: &str = "6f1c2a9e-8d4b-4f3a-9b2e-1a7c5d3e9f01";
const STRANGER: &str = "00000000-0000-0000-0000-000000000000";
const HARDWARE_ID: &str = "AA:BB:CC:DD:EE:FF";
const DEVICE_TIME: i64 = 1_700_000_000;
const SENT_AT: i64 = 1_700_000_005;

fn installation_id() -> String {
    "x".repeat(TelemetryPayload::INSTALLATION_ID_LEN)
}

fn composer(identity: &str, key: &DevicePrivateKey) -> Composer {
    Composer::new(DeviceIdentity::parse(identity).unwrap(), key.clone(), SharedSecret::new(SECRET))
}

/// Counts inserts and forwards them to an in-memory store.
#[derive(Default)]
struct CountingSink {
    calls: AtomicUsize,
    inner: MemoryTelemetryStore,
}

#[async_trait]
impl TelemetrySink for CountingSink {
    async fn insert(
        &self,
        identity: &DeviceIdentity,
        payload: &TelemetryPayload,
    ) -> Result<RecordId, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(identity, payload).await
    }
}

struct FailingSink;

#[async_trait]
impl TelemetrySink for FailingSink {
    async fn insert(
        &self,
        _identity: &DeviceIdentity,
        _payload: &TelemetryPayload,
    ) -> Result<RecordId, StorageError> {
        Err(StorageError::Backend("disk full".into()))
    }
}

struct Server {
    sink: Arc<CountingSink>,
    session: Session,
}

fn server() -> Server {
    let registry = Arc::new(MemoryKeyRegistry::new());
    registry.register(
        DeviceIdentity::parse(DEVICE).unwrap(),
        DEVICE_KEY.public_key().to_pem().unwrap(),
    );

    let sink = Arc::new(CountingSink::default());
    let table =
        DispatchTable::standard(Arc::new(SharedSecret::new(SECRET)), registry, sink.clone());
    Server { sink, session: Session::new(table, SessionConfig::default()) }
}

/// Feed `wire` to a fresh session and collect its result and response bytes.
async fn exchange(session: &Session, wire: &[u8]) -> (Result<Outcome, SessionError>, Vec<u8>) {
    let (mut device, mut collector) = tokio::io::duplex(1 << 17);
    device.write_all(wire).await.unwrap();

    let result = session.run(&mut collector).await;
    drop(collector);

    let mut response = Vec::new();
    device.read_to_end(&mut response).await.unwrap();
    (result, response)
}

#[tokio::test]
async fn valid_report_is_persisted_and_acknowledged() {
    let server = server();
    let frame = composer(DEVICE, &DEVICE_KEY)
        .compose_at(HARDWARE_ID, &installation_id(), DEVICE_TIME, SENT_AT)
        .unwrap();

    let (result, response) = exchange(&server.session, &frame.to_vec()).await;

    assert_eq!(result.unwrap(), Outcome::Stored(1));
    assert_eq!(response, ACK);

    let records = server.sink.inner.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].identity.as_str(), DEVICE);
    assert_eq!(records[0].payload.hardware_id, HARDWARE_ID);
    assert_eq!(records[0].payload.device_time, DEVICE_TIME);
    assert_eq!(records[0].payload.sent_at, SENT_AT);
    assert_eq!(
        records[0].payload.forge_resistance,
        derive_forge_hash(&installation_id()).unwrap()
    );
}

#[tokio::test]
async fn ciphertext_tampered_after_sealing_is_rejected() {
    let server = server();
    let payload =
        Composer::payload(HARDWARE_ID, &installation_id(), DEVICE_TIME, SENT_AT).unwrap();
    let frame = composer(DEVICE, &DEVICE_KEY).seal_payload(&payload).unwrap();

    // GCM is a stream cipher: plaintext byte i sits at ciphertext byte i
    let json = payload.to_json().unwrap();
    let needle = format!("\"{}\"", installation_id());
    let start = json.windows(needle.len()).position(|w| w == needle.as_bytes()).unwrap();
    let last_char = start + needle.len() - 2;

    let mut wire = frame.to_vec();
    wire[FrameHeader::SIZE + EnvelopeBody::FIXED_LEN + last_char] ^= b'x' ^ b'y';

    let (result, response) = exchange(&server.session, &wire).await;

    assert!(matches!(result, Err(SessionError::Authentication(CryptoError::Authentication))));
    assert!(response.is_empty());
    assert_eq!(server.sink.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn stale_forge_hash_is_rejected() {
    let server = server();
    let mut payload =
        Composer::payload(HARDWARE_ID, &installation_id(), DEVICE_TIME, SENT_AT).unwrap();
    payload.installation_id.replace_range(20..21, "y");
    let frame = composer(DEVICE, &DEVICE_KEY).seal_payload(&payload).unwrap();

    let (result, response) = exchange(&server.session, &frame.to_vec()).await;

    assert!(matches!(result, Err(SessionError::ForgeHashMismatch)));
    assert!(response.is_empty());
    assert_eq!(server.sink.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn device_shaped_json_is_acknowledged() {
    let server = server();
    let json = format!(
        r#"{{"PayphoneMAC":"{HARDWARE_ID}","PayphoneID":"{id}","PayphoneTime":{DEVICE_TIME},"Time":{SENT_AT},"ForgeResistance":"{hash}"}}"#,
        id = installation_id(),
        hash = derive_forge_hash(&installation_id()).unwrap(),
    );
    let frame = composer(DEVICE, &DEVICE_KEY).seal_bytes(json.as_bytes()).unwrap();

    let (result, response) = exchange(&server.session, &frame.to_vec()).await;

    assert_eq!(result.unwrap(), Outcome::Stored(1));
    assert_eq!(response, ACK);

    let records = server.sink.inner.records();
    assert_eq!(records[0].payload.hardware_id, HARDWARE_ID);
    assert_eq!(records[0].payload.installation_id, installation_id());
    assert_eq!(records[0].payload.device_time, DEVICE_TIME);
    assert_eq!(records[0].payload.sent_at, SENT_AT);
}

#[tokio::test]
async fn uppercase_forge_hash_is_rejected() {
    let server = server();
    let mut payload =
        Composer::payload(HARDWARE_ID, &installation_id(), DEVICE_TIME, SENT_AT).unwrap();
    payload.forge_resistance = payload.forge_resistance.to_uppercase();
    let frame = composer(DEVICE, &DEVICE_KEY).seal_payload(&payload).unwrap();

    let (result, response) = exchange(&server.session, &frame.to_vec()).await;

    assert!(matches!(result, Err(SessionError::ForgeHashMismatch)));
    assert!(response.is_empty());
    assert_eq!(server.sink.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn overlong_hardware_id_is_rejected() {
    let server = server();
    let payload = TelemetryPayload {
        hardware_id: "AA:BB:CC:DD:EE:FF:00".to_owned(),
        installation_id: installation_id(),
        device_time: DEVICE_TIME,
        sent_at: SENT_AT,
        forge_resistance: derive_forge_hash(&installation_id()).unwrap(),
    };
    let frame = composer(DEVICE, &DEVICE_KEY).seal_payload(&payload).unwrap();

    let (result, response) = exchange(&server.session, &frame.to_vec()).await;

    assert!(matches!(result, Err(SessionError::Validation(_))));
    assert!(response.is_empty());
    assert_eq!(server.sink.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unregistered_device_never_reaches_the_sink() {
    let server = server();
    let frame = composer(STRANGER, &DEVICE_KEY)
        .compose_at(HARDWARE_ID, &installation_id(), DEVICE_TIME, SENT_AT)
        .unwrap();

    let (result, response) = exchange(&server.session, &frame.to_vec()).await;

    assert!(matches!(result, Err(SessionError::Resolve(ResolveError::UnknownDevice(_)))));
    assert!(response.is_empty());
    assert_eq!(server.sink.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn wrong_signing_key_is_rejected() {
    let server = server();
    let frame = composer(DEVICE, &ROGUE_KEY)
        .compose_at(HARDWARE_ID, &installation_id(), DEVICE_TIME, SENT_AT)
        .unwrap();

    let (result, response) = exchange(&server.session, &frame.to_vec()).await;

    assert!(matches!(result, Err(SessionError::Authentication(_))));
    assert!(response.is_empty());
}

#[tokio::test]
async fn wrong_shared_secret_fails_decryption() {
    let server = server();
    let outsider = Composer::new(
        DeviceIdentity::parse(DEVICE).unwrap(),
        DEVICE_KEY.clone(),
        SharedSecret::new([0x13; 32]),
    );
    let frame =
        outsider.compose_at(HARDWARE_ID, &installation_id(), DEVICE_TIME, SENT_AT).unwrap();

    let (result, response) = exchange(&server.session, &frame.to_vec()).await;

    assert!(matches!(result, Err(SessionError::Decryption(CryptoError::Decryption))));
    assert!(response.is_empty());
}

#[tokio::test]
async fn non_json_plaintext_is_rejected() {
    let server = server();
    let frame = composer(DEVICE, &DEVICE_KEY).seal_bytes(b"hello").unwrap();

    let (result, response) = exchange(&server.session, &frame.to_vec()).await;

    assert!(matches!(result, Err(SessionError::Payload(_))));
    assert!(response.is_empty());
}

#[tokio::test]
async fn bad_marker_closes_silently() {
    let server = server();
    let mut wire = Frame::new(FrameType::Test, vec![0; 4]).unwrap().to_vec();
    wire[0] = 0x55;
    wire[1] = 0xAA;

    let (result, response) = exchange(&server.session, &wire).await;

    assert!(matches!(result, Err(SessionError::Frame(ProtocolError::InvalidMarker { .. }))));
    assert!(response.is_empty());
}

#[tokio::test]
async fn unknown_frame_type_closes_silently() {
    let server = server();
    let wire = Frame::with_raw_type(0x7f, vec![1, 2, 3]).unwrap().to_vec();

    let (result, response) = exchange(&server.session, &wire).await;

    assert!(matches!(result, Err(SessionError::Unrouted(0x7f))));
    assert!(response.is_empty());
}

#[tokio::test]
async fn short_telemetry_body_is_rejected_before_slicing() {
    let server = server();
    let wire = Frame::new(FrameType::Telemetry, vec![b'a'; EnvelopeBody::MIN_LEN - 1])
        .unwrap()
        .to_vec();

    let (result, response) = exchange(&server.session, &wire).await;

    assert!(matches!(
        result,
        Err(SessionError::Body(ProtocolError::BodyTooShort { min: EnvelopeBody::MIN_LEN, .. }))
    ));
    assert!(response.is_empty());
}

#[tokio::test]
async fn truncated_stream_closes_silently() {
    let server = server();
    let wire = Frame::new(FrameType::Test, vec![0; 32]).unwrap().to_vec();

    let (mut device, mut collector) = tokio::io::duplex(1024);
    device.write_all(&wire[..20]).await.unwrap();
    device.shutdown().await.unwrap();

    let result = server.session.run(&mut collector).await;
    assert!(matches!(result, Err(SessionError::Frame(ProtocolError::Io(_)))));
}

#[tokio::test]
async fn reserved_types_are_acknowledged() {
    let server = server();

    for frame_type in [FrameType::KeyExchange, FrameType::Test] {
        let wire = Frame::new(frame_type, b"ping".to_vec()).unwrap().to_vec();
        let (result, response) = exchange(&server.session, &wire).await;

        assert_eq!(result.unwrap(), Outcome::Accepted);
        assert_eq!(response, ACK);
    }
    assert_eq!(server.sink.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn storage_failure_withholds_acknowledgment() {
    let registry = Arc::new(MemoryKeyRegistry::new());
    registry.register(
        DeviceIdentity::parse(DEVICE).unwrap(),
        DEVICE_KEY.public_key().to_pem().unwrap(),
    );
    let table = DispatchTable::standard(
        Arc::new(SharedSecret::new(SECRET)),
        registry,
        Arc::new(FailingSink),
    );
    let session = Session::new(table, SessionConfig::default());

    let frame = composer(DEVICE, &DEVICE_KEY)
        .compose_at(HARDWARE_ID, &installation_id(), DEVICE_TIME, SENT_AT)
        .unwrap();
    let (result, response) = exchange(&session, &frame.to_vec()).await;

    let err = result.unwrap_err();
    assert!(err.is_internal());
    assert!(matches!(err, SessionError::Storage(_)));
    assert!(response.is_empty());
}

#[tokio::test(start_paused = true)]
async fn silent_peer_times_out() {
    let server = server();
    let (_device, mut collector) = tokio::io::duplex(1024);

    let result = server.session.run(&mut collector).await;
    assert!(matches!(result, Err(SessionError::ReadTimeout(_))));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn arbitrary_telemetry_bodies_are_never_acknowledged(
        body in prop::collection::vec(any::<u8>(), 0..1024),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let server = server();
        let wire = Frame::new(FrameType::Telemetry, body).unwrap().to_vec();

        let (result, response) = runtime.block_on(exchange(&server.session, &wire));

        prop_assert!(result.is_err());
        prop_assert!(response.is_empty());
        prop_assert_eq!(server.sink.calls.load(Ordering::SeqCst), 0);
    }
}
