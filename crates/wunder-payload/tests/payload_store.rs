use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wunder_payload::{
    BaselinePayload, BubbleHost, LocationAccess, MemoryReplica, Participant, ParticipantDirectory,
    ParticipantId, ParticipantStatus, PayloadStore, StatusWrite, SHARED_NOTIFICATION_TEXT,
};
use wunder_weather::{Coordinate, CurrentConditions, DailyForecast};

#[derive(Default)]
struct RecordingHost {
    notifications: Mutex<Vec<String>>,
}

impl BubbleHost for RecordingHost {
    fn send_minor_notification(&self, text: &str) {
        self.notifications.lock().push(text.to_string());
    }

    fn set_send_enabled(&self, _enabled: bool) {}

    fn location_access(&self) -> LocationAccess {
        LocationAccess::Authorized
    }
}

/// Directory whose local identity can change mid-test.
#[derive(Default)]
struct SwitchableDirectory {
    me: Mutex<Option<Participant>>,
}

impl SwitchableDirectory {
    fn set_me(&self, id: &str) {
        *self.me.lock() = Some(Participant::new(id));
    }
}

impl ParticipantDirectory for SwitchableDirectory {
    fn me(&self) -> Option<Participant> {
        self.me.lock().clone()
    }

    fn participants(&self) -> Vec<Participant> {
        self.me.lock().iter().cloned().collect()
    }
}

struct Harness {
    store: PayloadStore,
    replica: MemoryReplica,
    directory: Arc<SwitchableDirectory>,
    host: Arc<RecordingHost>,
    emits: Arc<AtomicUsize>,
}

fn harness() -> Harness {
    let replica = MemoryReplica::new();
    let directory = Arc::new(SwitchableDirectory::default());
    let host = Arc::new(RecordingHost::default());
    let store = PayloadStore::new(Arc::new(replica.clone()), directory.clone(), host.clone());

    let emits = Arc::new(AtomicUsize::new(0));
    let counter = emits.clone();
    store.subscribe(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    Harness {
        store,
        replica,
        directory,
        host,
        emits,
    }
}

fn austin() -> Coordinate {
    Coordinate::new(30.27, -97.74)
}

fn conditions(temp: i64) -> CurrentConditions {
    CurrentConditions {
        temp: Some(temp),
        description: Some("Clear".into()),
        ..Default::default()
    }
}

fn forecast() -> Vec<DailyForecast> {
    vec![DailyForecast {
        date: Some(1_700_000_000),
        high: Some("80".into()),
        low: Some("60".into()),
        icon: Some("clear".into()),
    }]
}

/// A sent baseline owned by `owner` with a complete status.
fn sent_baseline(uuid: &str) -> BaselinePayload {
    BaselinePayload {
        uuid: Some(uuid.into()),
        initial_layout: None,
        status: ParticipantStatus {
            location: Some(austin()),
            city: Some("Austin, TX".into()),
            time: Some("2026-04-02T16:05:09.123Z".into()),
            current: Some(conditions(72)),
            daily: Some(forecast()),
        },
    }
}

#[test]
fn test_initialize_generates_uuid_and_layout() {
    let h = harness();
    assert!(!h.store.is_initialized());

    h.store.initialize(BaselinePayload::default(), None);

    let snapshot = h.store.snapshot();
    let uuid = snapshot.uuid.expect("uuid generated");
    assert!(!uuid.is_empty());
    assert_eq!(snapshot.initial_layout.map(|l| l.ratio), Some(1.0));
    assert_eq!(h.emits.load(Ordering::SeqCst), 1);
    assert_eq!(h.replica.listener_count(&uuid), 1);
}

#[test]
fn test_reinitialize_same_uuid_any_case_is_noop() {
    let h = harness();
    h.store.initialize(BaselinePayload::with_uuid("abc-DEF"), None);
    h.replica.set("abc-DEF", "p-2", json!({ "city": "Reno, NV" }));
    h.replica.flush();
    assert_eq!(h.store.statuses().len(), 1);

    let mut other = BaselinePayload::with_uuid("ABC-def");
    other.status.city = Some("Elsewhere".into());
    h.store.initialize(other, None);

    assert_eq!(h.store.uuid().as_deref(), Some("abc-DEF"));
    assert_eq!(h.store.statuses().len(), 1);
    assert_eq!(h.store.snapshot().status.city, None);
    assert_eq!(h.replica.listener_count("abc-DEF"), 1);
}

#[test]
fn test_reinitialize_new_uuid_resets_mapping() {
    let h = harness();
    h.store.initialize(BaselinePayload::with_uuid("one"), None);
    h.replica.set("one", "p-2", json!({ "city": "Reno, NV" }));
    h.replica.flush();

    h.store.initialize(BaselinePayload::with_uuid("two"), None);
    assert!(h.store.statuses().is_empty());
    assert_eq!(h.replica.listener_count("one"), 0);

    // Late writes to the abandoned namespace are not seen.
    h.replica.set("one", "p-3", json!({ "city": "Boise, ID" }));
    h.replica.flush();
    assert!(h.store.statuses().is_empty());
}

#[test]
fn test_ready_to_send_needs_all_fields_in_any_order() {
    let h = harness();
    h.store.initialize(BaselinePayload::default(), None);
    assert!(!h.store.is_ready_to_send());

    h.store
        .set_location_and_forecast(None, None, None, Some(forecast()));
    assert!(!h.store.is_ready_to_send());

    h.store
        .set_location_and_forecast(None, Some("Austin, TX".into()), Some(conditions(70)), None);
    assert!(!h.store.is_ready_to_send());

    h.store
        .set_location_and_forecast(Some(austin()), None, None, None);
    assert!(h.store.is_ready_to_send());
}

#[test]
fn test_pre_send_write_fills_baseline_once() {
    let h = harness();
    h.store.initialize(BaselinePayload::default(), None);
    let emits_after_init = h.emits.load(Ordering::SeqCst);

    let first = h.store.set_location_and_forecast(
        Some(austin()),
        Some("Austin, TX".into()),
        Some(conditions(72)),
        Some(forecast()),
    );
    assert_eq!(first, StatusWrite::Baseline);
    let stamped = h.store.snapshot().status.time.clone();
    assert!(stamped.is_some());

    let second = h.store.set_location_and_forecast(
        Some(Coordinate::new(1.0, 2.0)),
        Some("Elsewhere".into()),
        Some(conditions(10)),
        Some(Vec::new()),
    );
    assert_eq!(second, StatusWrite::Ignored);

    let status = h.store.snapshot().status;
    assert_eq!(status.location, Some(austin()));
    assert_eq!(status.city.as_deref(), Some("Austin, TX"));
    assert_eq!(status.current.and_then(|c| c.temp), Some(72));
    assert_eq!(status.time, stamped);
    assert_eq!(h.emits.load(Ordering::SeqCst), emits_after_init + 1);
    assert!(h.replica.updates().is_empty());
}

#[test]
fn test_owner_status_reflects_baseline() {
    let h = harness();
    h.store
        .initialize(sent_baseline("s-1"), Some(ParticipantId::new("owner")));

    let status = h
        .store
        .participant_status(&"owner".into())
        .expect("owner status");
    assert_eq!(status, sent_baseline("s-1").status);

    // A replicated entry under the owner's key does not shadow the baseline.
    h.replica.set("s-1", "owner", json!({ "city": "Spoofed" }));
    h.replica.flush();
    let status = h.store.participant_status(&"owner".into()).unwrap();
    assert_eq!(status.city.as_deref(), Some("Austin, TX"));
    assert!(h.store.statuses().is_empty());
}

#[test]
fn test_other_participant_absent_until_snapshot() {
    let h = harness();
    h.store
        .initialize(sent_baseline("s-1"), Some(ParticipantId::new("owner")));
    assert!(h.store.participant_status(&"p-2".into()).is_none());

    h.replica.set("s-1", "p-2", json!({ "city": "Reno, NV", "location": { "latitude": 39.5, "longitude": -119.8 } }));
    h.replica.flush();

    let status = h.store.participant_status(&"p-2".into()).unwrap();
    assert_eq!(status.city.as_deref(), Some("Reno, NV"));
    assert_eq!(status.location, Some(Coordinate::new(39.5, -119.8)));
}

#[test]
fn test_post_send_write_by_participant_is_shared() {
    let h = harness();
    h.directory.set_me("p-2");
    h.store
        .initialize(sent_baseline("s-1"), Some(ParticipantId::new("owner")));
    let emits_before = h.emits.load(Ordering::SeqCst);

    let write = h.store.set_location_and_forecast(
        Some(Coordinate::new(39.5, -119.8)),
        Some("Reno, NV".into()),
        Some(conditions(55)),
        Some(forecast()),
    );
    assert_eq!(write, StatusWrite::Shared);

    let mine = h.store.participant_status(&"p-2".into()).unwrap();
    assert_eq!(mine.city.as_deref(), Some("Reno, NV"));
    assert!(mine.time.is_some());

    let updates = h.replica.updates();
    assert_eq!(updates.len(), 1);
    let (namespace, partial) = &updates[0];
    assert_eq!(namespace, "s-1");
    assert_eq!(partial.keys().collect::<Vec<_>>(), vec!["p-2"]);
    assert_eq!(partial["p-2"]["city"], json!("Reno, NV"));

    assert_eq!(h.emits.load(Ordering::SeqCst), emits_before + 1);
    assert_eq!(
        *h.host.notifications.lock(),
        vec![SHARED_NOTIFICATION_TEXT.to_string()]
    );

    // The baseline is untouched after sending.
    assert_eq!(h.store.snapshot().status, sent_baseline("s-1").status);
}

#[test]
fn test_post_send_write_with_unresolved_owner_is_shared() {
    let h = harness();
    h.directory.set_me("p-2");
    h.store.initialize(sent_baseline("s-1"), None);

    let write = h.store.set_location_and_forecast(
        Some(Coordinate::new(39.5, -119.8)),
        Some("Reno, NV".into()),
        Some(conditions(55)),
        Some(forecast()),
    );
    assert_eq!(write, StatusWrite::Shared);
    assert_eq!(
        h.store
            .participant_status(&"p-2".into())
            .and_then(|s| s.city),
        Some("Reno, NV".to_string())
    );
    assert_eq!(h.replica.updates().len(), 1);
    assert_eq!(h.host.notifications.lock().len(), 1);
    assert_eq!(h.store.snapshot().status, sent_baseline("s-1").status);
}

#[test]
fn test_post_send_write_by_owner_is_ignored() {
    let h = harness();
    h.directory.set_me("owner");
    h.store
        .initialize(sent_baseline("s-1"), Some(ParticipantId::new("owner")));
    let emits_before = h.emits.load(Ordering::SeqCst);

    let write = h
        .store
        .set_location_and_forecast(Some(austin()), None, None, None);
    assert_eq!(write, StatusWrite::Ignored);
    assert!(h.replica.updates().is_empty());
    assert!(h.host.notifications.lock().is_empty());
    assert_eq!(h.emits.load(Ordering::SeqCst), emits_before);
}

#[test]
fn test_uninitialized_calls_are_noops() {
    let h = harness();
    let write = h
        .store
        .set_location_and_forecast(Some(austin()), None, None, None);
    assert_eq!(write, StatusWrite::Ignored);
    assert!(!h.store.is_ready_to_send());
    assert!(h.store.participant_status(&"anyone".into()).is_none());
    assert_eq!(h.store.snapshot(), BaselinePayload::default());
    assert_eq!(h.emits.load(Ordering::SeqCst), 0);
}

#[test]
fn test_snapshot_replaces_mapping_and_skips_bad_entries() {
    let h = harness();
    h.store
        .initialize(sent_baseline("s-1"), Some(ParticipantId::new("owner")));

    h.replica.set("s-1", "p-2", json!({ "city": "Reno, NV" }));
    h.replica.set("s-1", "p-3", json!(42));
    h.replica.flush();

    let statuses = h.store.statuses();
    assert_eq!(statuses.len(), 1);
    assert!(statuses.contains_key(&ParticipantId::new("p-2")));
}

#[test]
fn test_snapshot_without_key_drops_entry() {
    let h = harness();
    h.store
        .initialize(sent_baseline("s-1"), Some(ParticipantId::new("owner")));
    h.replica.set("s-1", "p-2", json!({ "city": "Reno, NV" }));
    h.replica.set("s-1", "p-3", json!({ "city": "Boise, ID" }));
    h.replica.flush();
    assert_eq!(h.store.statuses().len(), 2);

    h.replica.remove("s-1", "p-3");
    h.replica.flush();

    let statuses = h.store.statuses();
    assert_eq!(statuses.len(), 1);
    assert!(statuses.contains_key(&ParticipantId::new("p-2")));
    assert!(h.store.participant_status(&"p-3".into()).is_none());
}

#[test]
fn test_stale_snapshot_overwrites_local_write() {
    let h = harness();
    h.directory.set_me("p-2");
    h.store
        .initialize(sent_baseline("s-1"), Some(ParticipantId::new("owner")));
    h.replica.set("s-1", "p-3", json!({ "city": "Boise, ID" }));
    h.replica.flush();

    h.store.set_location_and_forecast(
        Some(Coordinate::new(39.5, -119.8)),
        Some("Reno, NV".into()),
        Some(conditions(55)),
        Some(forecast()),
    );
    assert!(h.store.participant_status(&"p-2".into()).is_some());

    // The backend answers with contents that predate the write.
    h.replica.remove("s-1", "p-2");
    h.replica.flush();

    assert!(h.store.participant_status(&"p-2".into()).is_none());
    assert!(h.store.statuses().contains_key(&ParticipantId::new("p-3")));
}

#[test]
fn test_snapshot_keeps_entry_with_mistyped_fields() {
    let h = harness();
    h.store
        .initialize(sent_baseline("s-1"), Some(ParticipantId::new("owner")));
    h.replica.set(
        "s-1",
        "p-2",
        json!({
            "location": { "latitude": 39.5, "longitude": -119.8 },
            "city": "Reno, NV",
            "current": { "temp": 71.6, "humidity": 65 }
        }),
    );
    h.replica.flush();

    let status = h.store.participant_status(&"p-2".into()).unwrap();
    assert_eq!(status.city.as_deref(), Some("Reno, NV"));
    let current = status.current.unwrap();
    assert_eq!(current.temp, Some(71));
    assert_eq!(current.humidity.as_deref(), Some("65"));
}

#[test]
fn test_compose_then_sent_transition_keeps_session() {
    let h = harness();
    h.store.initialize(BaselinePayload::default(), None);
    h.store.set_location_and_forecast(
        Some(austin()),
        Some("Austin, TX".into()),
        Some(conditions(72)),
        Some(forecast()),
    );
    let sent = h.store.snapshot();

    h.store.initialize(sent.clone(), Some(ParticipantId::new("owner")));

    assert_eq!(h.store.owner(), Some(ParticipantId::new("owner")));
    assert_eq!(h.store.snapshot(), sent);
}

#[test]
fn test_close_detaches_replica() {
    let h = harness();
    h.store.initialize(BaselinePayload::with_uuid("s-1"), None);
    h.store.close();
    assert_eq!(h.replica.listener_count("s-1"), 0);
    assert_eq!(h.store.uuid().as_deref(), Some("s-1"));
}
