//! Services the embedding host provides.

use crate::identity::{Participant, ParticipantId};

/// The conversation's participant list.
pub trait ParticipantDirectory: Send + Sync {
    /// The participant running this instance, once the host knows it.
    fn me(&self) -> Option<Participant>;

    /// Current participants, in the host's display order.
    fn participants(&self) -> Vec<Participant>;

    fn participant(&self, id: &ParticipantId) -> Option<Participant> {
        self.participants()
            .into_iter()
            .find(|p| &p.identifier == id)
    }

    fn display_name(&self, id: &ParticipantId) -> Option<String> {
        self.participant(id)
            .and_then(|p| p.name().map(str::to_string))
    }
}

/// Location privacy setting as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationAccess {
    /// The user hasn't been asked yet
    #[default]
    Unknown,
    Authorized,
    Denied,
    /// Blocked by device policy; the user can't change it
    Restricted,
}

impl LocationAccess {
    pub fn is_authorized(self) -> bool {
        matches!(self, LocationAccess::Authorized)
    }

    /// Whether asking the user (or sending them to settings) can help.
    pub fn can_request(self) -> bool {
        !matches!(self, LocationAccess::Authorized | LocationAccess::Restricted)
    }
}

/// Bubble chrome and notifications owned by the host.
pub trait BubbleHost: Send + Sync {
    /// Post a short notification on behalf of the local participant.
    fn send_minor_notification(&self, text: &str);

    /// Enable or disable the host's "send" action.
    fn set_send_enabled(&self, enabled: bool);

    fn location_access(&self) -> LocationAccess;
}

/// Fixed participant list, for hosts that hand over a static roster.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    pub me: Option<Participant>,
    pub participants: Vec<Participant>,
}

impl ParticipantDirectory for StaticDirectory {
    fn me(&self) -> Option<Participant> {
        self.me.clone()
    }

    fn participants(&self) -> Vec<Participant> {
        self.participants.clone()
    }
}
