//! Participant identity, normalized once at the API boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a conversation participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ParticipantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Participant record as the host's directory reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub identifier: ParticipantId,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Participant {
    pub fn new(identifier: impl Into<ParticipantId>) -> Self {
        Self {
            identifier: identifier.into(),
            short_name: None,
            display_name: None,
        }
    }

    pub fn with_short_name(mut self, name: impl Into<String>) -> Self {
        self.short_name = Some(name.into());
        self
    }

    /// Short name, falling back to the display name.
    pub fn name(&self) -> Option<&str> {
        self.short_name.as_deref().or(self.display_name.as_deref())
    }
}

/// Sender of a bubble as handed over by the host: either a bare identifier
/// or a full participant record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SenderRef {
    Identifier(String),
    Record {
        #[serde(default)]
        identifier: Option<String>,
    },
}

impl SenderRef {
    /// Resolve to an identity; empty identifiers resolve to none.
    pub fn resolve(self) -> Option<ParticipantId> {
        let id = match self {
            SenderRef::Identifier(id) => id,
            SenderRef::Record { identifier } => identifier?,
        };
        (!id.is_empty()).then(|| ParticipantId(id))
    }
}

impl From<&Participant> for SenderRef {
    fn from(participant: &Participant) -> Self {
        SenderRef::Record {
            identifier: Some(participant.identifier.0.clone()),
        }
    }
}
