//! Payload store: the baseline payload plus the replicated status mapping.
//!
//! The baseline is the record the host writes into the conversation stream.
//! Before it is sent, the owner's status is collected into it; afterwards it is
//! immutable, and every other participant shares their status through the
//! replica namespace named by the baseline's `uuid`.

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use wunder_weather::{Coordinate, CurrentConditions, DailyForecast, Observation};

use crate::host::{BubbleHost, ParticipantDirectory};
use crate::identity::ParticipantId;
use crate::notifier::{ChangeNotifier, Subscription};
use crate::replica::{ReplicaHandle, ReplicaSnapshot, ReplicaStore, SnapshotCallback};
use crate::status::{BaselinePayload, LayoutHint, ParticipantStatus};

/// Text of the host notification sent when a participant shares a status.
pub const SHARED_NOTIFICATION_TEXT: &str = "shared weather";

/// Statuses of participants other than the owner.
pub type StatusMap = BTreeMap<ParticipantId, ParticipantStatus>;

/// What `set_location_and_forecast` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusWrite {
    /// Filled unset fields of the baseline
    Baseline,
    /// Stored and replicated under the local identity
    Shared,
    Ignored,
}

#[derive(Default)]
struct StoreState {
    baseline: Option<BaselinePayload>,
    owner: Option<ParticipantId>,
    statuses: StatusMap,
    replica: Option<Arc<dyn ReplicaHandle>>,
    /// Bumped per session so late snapshots from an old namespace are dropped
    generation: u64,
}

enum Pending {
    Baseline { changed: bool },
    Share {
        me: ParticipantId,
        status: ParticipantStatus,
        replica: Option<Arc<dyn ReplicaHandle>>,
    },
    Nothing,
}

/// Single source of truth for one bubble session. Clones share state.
#[derive(Clone)]
pub struct PayloadStore {
    state: Arc<Mutex<StoreState>>,
    notifier: ChangeNotifier,
    replica: Arc<dyn ReplicaStore>,
    directory: Arc<dyn ParticipantDirectory>,
    host: Arc<dyn BubbleHost>,
}

impl PayloadStore {
    pub fn new(
        replica: Arc<dyn ReplicaStore>,
        directory: Arc<dyn ParticipantDirectory>,
        host: Arc<dyn BubbleHost>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            notifier: ChangeNotifier::new(),
            replica,
            directory,
            host,
        }
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.notifier.subscribe(handler)
    }

    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        self.notifier.unsubscribe(subscription)
    }

    /// Start (or resume) the session described by `baseline`.
    ///
    /// A baseline naming the current session (uuid compared case-insensitively)
    /// only refreshes the owner identity. Anything else starts a new session:
    /// statuses are cleared, a uuid is generated if missing, the layout hint is
    /// defaulted, and the replica namespace for the uuid is opened.
    pub fn initialize(&self, baseline: BaselinePayload, owner: Option<ParticipantId>) {
        let (generation, uuid, previous) = {
            let mut state = self.state.lock();

            if let Some(current) = &state.baseline {
                if current.same_session(&baseline) {
                    if state.owner != owner {
                        tracing::debug!("Session owner resolved to {:?}", owner);
                        if let Some(owner) = &owner {
                            state.statuses.remove(owner);
                        }
                        state.owner = owner;
                    }
                    return;
                }
            }

            let mut baseline = baseline;
            let uuid = baseline
                .uuid
                .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
                .clone();
            baseline.initial_layout.get_or_insert_with(LayoutHint::default);

            state.generation += 1;
            state.baseline = Some(baseline);
            state.owner = owner;
            state.statuses.clear();
            (state.generation, uuid, state.replica.take())
        };
        drop(previous);

        // Opened outside the lock: an adapter may deliver the first snapshot
        // from inside `on_snapshot`.
        let handle = match self.replica.open(&uuid) {
            Ok(handle) => {
                handle.on_snapshot(self.snapshot_callback(generation));
                Some(handle)
            }
            Err(e) => {
                tracing::warn!("Statuses for session {} will not be shared: {}", uuid, e);
                None
            }
        };

        {
            let mut state = self.state.lock();
            if state.generation == generation {
                state.replica = handle;
            }
        }

        tracing::info!("Session {} initialized", uuid);
        self.notifier.emit();
    }

    /// Detach from the replica. Reads keep working on the last known state.
    pub fn close(&self) {
        let previous = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.replica.take()
        };
        drop(previous);
    }

    fn snapshot_callback(&self, generation: u64) -> SnapshotCallback {
        let state = Arc::downgrade(&self.state);
        let notifier = self.notifier.clone();

        Box::new(move |snapshot| {
            let Some(state) = state.upgrade() else {
                return;
            };
            let mut statuses = decode_statuses(snapshot);
            {
                let mut state = state.lock();
                if state.generation != generation {
                    tracing::debug!("Ignoring snapshot from a previous session");
                    return;
                }
                if let Some(owner) = &state.owner {
                    statuses.remove(owner);
                }
                state.statuses = statuses;
            }
            notifier.emit();
        })
    }

    /// Deep copy of the baseline payload (empty before `initialize`).
    pub fn snapshot(&self) -> BaselinePayload {
        self.state.lock().baseline.clone().unwrap_or_default()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().baseline.is_some()
    }

    pub fn uuid(&self) -> Option<String> {
        self.state
            .lock()
            .baseline
            .as_ref()
            .and_then(|b| b.uuid.clone())
    }

    pub fn owner(&self) -> Option<ParticipantId> {
        self.state.lock().owner.clone()
    }

    /// The baseline has a uuid and every status field.
    pub fn is_ready_to_send(&self) -> bool {
        let state = self.state.lock();
        match &state.baseline {
            Some(baseline) => baseline.uuid.is_some() && baseline.status.is_complete(),
            None => false,
        }
    }

    /// The owner's status comes from the baseline; everyone else's from the
    /// replicated mapping.
    pub fn participant_status(&self, id: &ParticipantId) -> Option<ParticipantStatus> {
        let state = self.state.lock();
        let baseline = state.baseline.as_ref()?;
        if state.owner.as_ref() == Some(id) {
            Some(baseline.status.clone())
        } else {
            state.statuses.get(id).cloned()
        }
    }

    /// Copy of the replicated mapping.
    pub fn statuses(&self) -> StatusMap {
        self.state.lock().statuses.clone()
    }

    /// Record the local participant's location and weather.
    ///
    /// While the baseline has no location, unset baseline fields are filled
    /// and nothing is replicated. Once it has one, a participant other than
    /// the owner (including when the owner couldn't be resolved) gets a fresh
    /// status stored locally and pushed to the replica. The owner's data
    /// already lives in the baseline, so the owner's writes are ignored.
    pub fn set_location_and_forecast(
        &self,
        location: Option<Coordinate>,
        city: Option<String>,
        current: Option<CurrentConditions>,
        daily: Option<Vec<DailyForecast>>,
    ) -> StatusWrite {
        let me = self.directory.me().map(|p| p.identifier);
        let status = ParticipantStatus {
            location,
            city,
            time: Some(timestamp()),
            current,
            daily,
        };

        let pending = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let Some(baseline) = state.baseline.as_mut() else {
                tracing::debug!("Status ignored: no session");
                return StatusWrite::Ignored;
            };

            if baseline.status.location.is_none() {
                Pending::Baseline {
                    changed: baseline.status.fill_missing(status),
                }
            } else {
                match me {
                    Some(me) if state.owner.as_ref() != Some(&me) => {
                        state.statuses.insert(me.clone(), status.clone());
                        Pending::Share {
                            me,
                            status,
                            replica: state.replica.clone(),
                        }
                    }
                    _ => Pending::Nothing,
                }
            }
        };

        match pending {
            Pending::Baseline { changed: true } => {
                tracing::info!("Baseline status recorded");
                self.notifier.emit();
                StatusWrite::Baseline
            }
            Pending::Baseline { changed: false } => {
                tracing::debug!("Baseline status already set");
                StatusWrite::Ignored
            }
            Pending::Share {
                me,
                status,
                replica,
            } => {
                self.replicate(&me, &status, replica.as_deref());
                self.host.send_minor_notification(SHARED_NOTIFICATION_TEXT);
                self.notifier.emit();
                StatusWrite::Shared
            }
            Pending::Nothing => StatusWrite::Ignored,
        }
    }

    /// `set_location_and_forecast` for a normalized observation.
    pub fn record_observation(&self, observation: Observation) -> StatusWrite {
        self.set_location_and_forecast(
            observation.location,
            observation.city,
            Some(observation.current),
            Some(observation.daily),
        )
    }

    fn replicate(&self, me: &ParticipantId, status: &ParticipantStatus, replica: Option<&dyn ReplicaHandle>) {
        let Some(replica) = replica else {
            tracing::warn!("No replica open; status for {} kept locally", me);
            return;
        };

        let value = match serde_json::to_value(status) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to encode status for {}: {}", me, e);
                return;
            }
        };

        let update = ReplicaSnapshot::from([(me.to_string(), value)]);
        if let Err(e) = replica.update(update) {
            tracing::warn!("Failed to replicate status for {}: {}", me, e);
        }
    }
}

fn decode_statuses(snapshot: ReplicaSnapshot) -> StatusMap {
    snapshot
        .into_iter()
        .filter_map(
            |(key, value)| match serde_json::from_value::<ParticipantStatus>(value) {
                Ok(status) => Some((ParticipantId::from(key), status)),
                Err(e) => {
                    tracing::warn!("Skipping unreadable status for {}: {}", key, e);
                    None
                }
            },
        )
        .collect()
}

/// ISO-8601 with millisecond precision, e.g. `2026-04-02T16:05:09.123Z`.
fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_skips_unreadable_entries() {
        let snapshot = ReplicaSnapshot::from([
            ("good".to_string(), json!({ "city": "Reno, NV" })),
            ("bad".to_string(), json!("not a status")),
        ]);
        let statuses = decode_statuses(snapshot);
        assert_eq!(statuses.len(), 1);
        assert_eq!(
            statuses.get(&ParticipantId::new("good")).and_then(|s| s.city.as_deref()),
            Some("Reno, NV")
        );
    }

    #[test]
    fn test_decode_keeps_entry_with_mistyped_fields() {
        let snapshot = ReplicaSnapshot::from([(
            "p-2".to_string(),
            json!({
                "location": { "latitude": 39.53, "longitude": -119.81 },
                "city": "Reno, NV",
                "time": 1775145909,
                "current": { "temp": 71.6, "humidity": 65, "speed": "calm" },
                "daily": [{ "date": 1459562400, "high": 68 }, "tomorrow"]
            }),
        )]);
        let statuses = decode_statuses(snapshot);
        let status = statuses.get(&ParticipantId::new("p-2")).unwrap();

        assert_eq!(status.city.as_deref(), Some("Reno, NV"));
        assert_eq!(status.time.as_deref(), Some("1775145909"));
        let current = status.current.as_ref().unwrap();
        assert_eq!(current.temp, Some(71));
        assert_eq!(current.humidity.as_deref(), Some("65"));
        assert!(current.speed.is_none());
        let daily = status.daily.as_ref().unwrap();
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].high.as_deref(), Some("68"));
    }

    #[test]
    fn test_timestamp_shape() {
        let stamp = timestamp();
        assert!(stamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());
    }
}
