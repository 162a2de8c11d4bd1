//! Participants paired with their shared statuses, for list and map views.
//!
//! Order is the order participants were first seen and never reshuffles;
//! map markers are likewise only ever appended.

use wunder_payload::{ParticipantDirectory, ParticipantId, ParticipantStatus, PayloadStore};
use wunder_weather::{Coordinate, IconSource, ProviderLinks};

#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub participant: ParticipantId,
    pub name: Option<String>,
    pub status: Option<ParticipantStatus>,
}

impl RosterEntry {
    pub fn location(&self) -> Option<Coordinate> {
        self.status.as_ref().and_then(|s| s.location)
    }
}

/// A located participant on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub participant: ParticipantId,
    pub location: Coordinate,
}

#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: Vec<RosterEntry>,
    markers: Vec<MapMarker>,
    participant_count: usize,
    selection: Option<usize>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a roster from the current participant list.
    pub fn from_directory(directory: &dyn ParticipantDirectory, store: &PayloadStore) -> Self {
        let mut roster = Self::new();
        roster.participants_changed(directory, store);
        roster
    }

    /// Append newly seen participants and refresh names of known ones.
    pub fn participants_changed(&mut self, directory: &dyn ParticipantDirectory, store: &PayloadStore) {
        let participants = directory.participants();
        self.participant_count = participants.len();

        for participant in participants {
            let name = participant.name().map(str::to_string);
            match self
                .entries
                .iter_mut()
                .find(|e| e.participant == participant.identifier)
            {
                Some(existing) => existing.name = name,
                None => {
                    let status = store.participant_status(&participant.identifier);
                    self.entries.push(RosterEntry {
                        participant: participant.identifier,
                        name,
                        status,
                    });
                }
            }
        }

        self.add_markers();
    }

    /// Pick up new statuses for known participants.
    ///
    /// A status that disappears from the store is kept; shared statuses
    /// don't get withdrawn.
    pub fn statuses_changed(&mut self, store: &PayloadStore) {
        for entry in &mut self.entries {
            if let Some(status) = store.participant_status(&entry.participant) {
                entry.status = Some(status);
            }
        }
        self.add_markers();
    }

    fn add_markers(&mut self) {
        for entry in &self.entries {
            let Some(location) = entry.location() else {
                continue;
            };
            if !self.markers.iter().any(|m| m.participant == entry.participant) {
                self.markers.push(MapMarker {
                    participant: entry.participant.clone(),
                    location,
                });
            }
        }
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    /// Entries with a location, with their index in `entries`.
    pub fn located(&self) -> impl Iterator<Item = (usize, &RosterEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.location().is_some())
    }

    pub fn markers(&self) -> &[MapMarker] {
        &self.markers
    }

    /// Icon for a participant's current conditions.
    pub fn icon_for(&self, id: &ParticipantId, links: &ProviderLinks) -> IconSource {
        let icon = self
            .entries
            .iter()
            .find(|e| &e.participant == id)
            .and_then(|e| e.status.as_ref())
            .and_then(|s| s.current.as_ref())
            .and_then(|c| c.icon.as_deref());
        links.icon_source(icon)
    }

    /// Every participant is on the map.
    pub fn is_complete(&self) -> bool {
        self.participant_count == self.markers.len()
    }

    /// Whether `me` still has to share a located status. An empty roster
    /// never asks.
    pub fn needs_local_status(&self, me: Option<&ParticipantId>) -> bool {
        let Some(me) = me else {
            return false;
        };
        !self.entries.is_empty()
            && !self
                .entries
                .iter()
                .any(|e| &e.participant == me && e.location().is_some())
    }

    pub fn selection(&self) -> Option<usize> {
        self.selection
    }

    /// Expand one entry; out-of-range indexes clear the selection.
    pub fn select(&mut self, index: usize) {
        self.selection = (index < self.entries.len()).then_some(index);
    }
}
