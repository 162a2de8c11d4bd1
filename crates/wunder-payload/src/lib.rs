//! Session state for a weather-sharing bubble: the baseline payload, the
//! replicated per-participant statuses, and the change notifications the
//! view layer listens to.

pub mod host;
pub mod identity;
pub mod notifier;
pub mod replica;
pub mod rest_replica;
pub mod status;
pub mod store;

pub use host::{BubbleHost, LocationAccess, ParticipantDirectory, StaticDirectory};
pub use identity::{Participant, ParticipantId, SenderRef};
pub use notifier::{ChangeNotifier, Subscription};
pub use replica::{MemoryReplica, ReplicaHandle, ReplicaSnapshot, ReplicaStore, SnapshotCallback};
pub use rest_replica::{RestNamespace, RestReplica};
pub use status::{BaselinePayload, LayoutHint, ParticipantStatus, STATUS_KEYS};
pub use store::{PayloadStore, StatusMap, StatusWrite, SHARED_NOTIFICATION_TEXT};
