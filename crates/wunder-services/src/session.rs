//! The object a host embeds for one bubble.
//!
//! Owns the payload store and the fetch orchestrator, keeps the host's send
//! action in step with the store, and answers the view-level questions
//! (should we fetch, should we prompt) the bubble's screens ask.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use wunder_core::{AppError, Config, ConfigError};
use wunder_payload::{
    BaselinePayload, BubbleHost, LocationAccess, MemoryReplica, ParticipantDirectory,
    ParticipantId, PayloadStore, ReplicaStore, RestReplica, SenderRef, Subscription,
};
use wunder_weather::{GeolocationProvider, PositionOptions, ProviderLinks, WeatherClient, WeatherProvider};

use crate::fetch::{FetchFailure, FetchOrchestrator, FetchOutcome};
use crate::roster::Roster;

/// Presentation mode the host shows the bubble in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubbleMode {
    /// Composing, before the payload is sent
    Setup,
    Outgoing,
    Incoming,
    FullOutgoing,
    FullIncoming,
}

/// What the view should offer a participant who hasn't shared yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharePrompt {
    Hidden,
    /// Ask for location access first
    RequestAccess,
    Share,
}

/// Everything a session needs from its surroundings.
pub struct SessionParts {
    pub replica: Arc<dyn ReplicaStore>,
    pub directory: Arc<dyn ParticipantDirectory>,
    pub host: Arc<dyn BubbleHost>,
    pub geolocation: Arc<dyn GeolocationProvider>,
    pub weather: Arc<dyn WeatherClient>,
    pub position: PositionOptions,
    pub links: ProviderLinks,
}

pub struct BubbleSession {
    store: PayloadStore,
    orchestrator: FetchOrchestrator,
    directory: Arc<dyn ParticipantDirectory>,
    host: Arc<dyn BubbleHost>,
    links: ProviderLinks,
    send_gate: Subscription,
    mode: Mutex<Option<BubbleMode>>,
}

impl BubbleSession {
    pub fn new(parts: SessionParts) -> Self {
        let store = PayloadStore::new(parts.replica, parts.directory.clone(), parts.host.clone());
        let orchestrator = FetchOrchestrator::new(
            parts.geolocation,
            parts.weather,
            store.clone(),
            parts.position,
        );

        let gate_store = store.clone();
        let gate_host = parts.host.clone();
        let send_gate = store.subscribe(move || {
            gate_host.set_send_enabled(gate_store.is_ready_to_send());
        });

        Self {
            store,
            orchestrator,
            directory: parts.directory,
            host: parts.host,
            links: parts.links,
            send_gate,
            mode: Mutex::new(None),
        }
    }

    /// Build a session from configuration.
    ///
    /// Without a configured replica, statuses stay on this device. Background
    /// replica work runs on `runtime`.
    pub fn from_config(
        config: &Config,
        directory: Arc<dyn ParticipantDirectory>,
        host: Arc<dyn BubbleHost>,
        runtime: Handle,
    ) -> Result<Self, AppError> {
        let validation = config.validate();
        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }
        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        let replica: Arc<dyn ReplicaStore> =
            match RestReplica::from_config(&config.replica, runtime)? {
                Some(rest) => Arc::new(rest),
                None => Arc::new(MemoryReplica::new()),
            };

        Ok(Self::new(SessionParts {
            replica,
            directory,
            host,
            geolocation: wunder_weather::location::from_config(&config.geolocation),
            weather: Arc::new(WeatherProvider::new(&config.weather)?),
            position: PositionOptions::from(&config.geolocation),
            links: ProviderLinks::new(&config.weather),
        }))
    }

    /// Hand the session what the host knows when the bubble is shown.
    ///
    /// The sender only becomes the owner once the payload has been sent; in
    /// setup mode the session is still being composed.
    pub fn mount(&self, mode: BubbleMode, baseline: BaselinePayload, sender: Option<SenderRef>) {
        let owner = match mode {
            BubbleMode::Setup => None,
            _ => sender.and_then(SenderRef::resolve),
        };
        *self.mode.lock() = Some(mode);
        self.initialize(baseline, owner);
    }

    pub fn initialize(&self, baseline: BaselinePayload, owner: Option<ParticipantId>) {
        self.store.initialize(baseline, owner);
        self.host.set_send_enabled(self.store.is_ready_to_send());
    }

    pub fn store(&self) -> &PayloadStore {
        &self.store
    }

    pub fn orchestrator(&self) -> &FetchOrchestrator {
        &self.orchestrator
    }

    pub fn links(&self) -> &ProviderLinks {
        &self.links
    }

    pub fn is_ready_to_send(&self) -> bool {
        self.store.is_ready_to_send()
    }

    /// The payload for the host to write into the conversation, once complete.
    pub fn complete_setup(&self) -> Option<BaselinePayload> {
        if !self.store.is_ready_to_send() {
            tracing::debug!("Setup completed before the payload was ready");
            return None;
        }
        Some(self.store.snapshot())
    }

    pub fn location_access(&self) -> LocationAccess {
        self.host.location_access()
    }

    pub fn me(&self) -> Option<ParticipantId> {
        self.directory.me().map(|p| p.identifier)
    }

    pub fn mode(&self) -> Option<BubbleMode> {
        *self.mode.lock()
    }

    /// Locate and forecast, if the host allows location access.
    ///
    /// While composing, only a baseline without a location is filled; the
    /// payload isn't sent yet, so nothing may be shared.
    pub async fn refresh(&self) -> FetchOutcome {
        if self.mode() == Some(BubbleMode::Setup)
            && self.store.snapshot().status.location.is_some()
        {
            tracing::debug!("Baseline already located; not fetching during setup");
            return FetchOutcome::Skipped;
        }

        let access = self.host.location_access();
        if !access.is_authorized() {
            tracing::debug!("Location access is {:?}; not fetching", access);
            return FetchOutcome::Skipped;
        }
        self.orchestrator.locate_and_forecast().await
    }

    /// Fetch for the compose screen while its weather is still unknown.
    pub async fn ensure_compose_weather(&self) -> FetchOutcome {
        let status = self.store.snapshot().status;
        if status.location.is_some() && status.current.is_some() {
            return FetchOutcome::Skipped;
        }
        self.refresh().await
    }

    /// Roster of the current participants.
    pub fn roster(&self) -> Roster {
        Roster::from_directory(self.directory.as_ref(), &self.store)
    }

    pub fn share_prompt(&self, roster: &Roster) -> SharePrompt {
        if !roster.needs_local_status(self.me().as_ref()) {
            return SharePrompt::Hidden;
        }
        if self.host.location_access().is_authorized() {
            SharePrompt::Share
        } else {
            SharePrompt::RequestAccess
        }
    }

    pub fn last_failure(&self) -> Option<FetchFailure> {
        self.orchestrator.last_failure()
    }

    /// Stop tracking the store and detach from the replica.
    pub fn close(&self) {
        self.store.unsubscribe(self.send_gate);
        self.store.close();
    }
}

impl Drop for BubbleSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use wunder_payload::{Participant, StaticDirectory};
    use wunder_weather::NoLocationService;

    #[derive(Default)]
    struct GateHost {
        enabled: Mutex<Vec<bool>>,
        access: Mutex<LocationAccess>,
    }

    impl BubbleHost for GateHost {
        fn send_minor_notification(&self, _text: &str) {}
        fn set_send_enabled(&self, enabled: bool) {
            self.enabled.lock().push(enabled);
        }
        fn location_access(&self) -> LocationAccess {
            *self.access.lock()
        }
    }

    fn session(host: Arc<GateHost>, directory: StaticDirectory) -> BubbleSession {
        let config = Config::default();
        BubbleSession::new(SessionParts {
            replica: Arc::new(MemoryReplica::new()),
            directory: Arc::new(directory),
            host,
            geolocation: Arc::new(NoLocationService),
            weather: Arc::new(WeatherProvider::new(&config.weather).unwrap()),
            position: PositionOptions::default(),
            links: ProviderLinks::new(&config.weather),
        })
    }

    #[test]
    fn test_setup_mode_ignores_sender() {
        let host = Arc::new(GateHost::default());
        let s = session(host, StaticDirectory::default());
        s.mount(
            BubbleMode::Setup,
            BaselinePayload::default(),
            Some(SenderRef::Identifier("p-1".into())),
        );
        assert_eq!(s.store().owner(), None);

        let sent = s.store().snapshot();
        s.mount(
            BubbleMode::Incoming,
            sent,
            Some(SenderRef::Identifier("p-1".into())),
        );
        assert_eq!(s.store().owner(), Some("p-1".into()));
    }

    #[test]
    fn test_send_gate_follows_store() {
        let host = Arc::new(GateHost::default());
        let s = session(host.clone(), StaticDirectory::default());
        s.initialize(BaselinePayload::default(), None);
        assert_eq!(host.enabled.lock().last(), Some(&false));
        assert!(s.complete_setup().is_none());

        s.store().set_location_and_forecast(
            Some(wunder_weather::Coordinate::new(1.0, 2.0)),
            Some("X, Y".into()),
            Some(Default::default()),
            Some(Vec::new()),
        );
        assert_eq!(host.enabled.lock().last(), Some(&true));

        let payload = s.complete_setup().unwrap();
        assert!(payload.uuid.is_some());
    }

    #[tokio::test]
    async fn test_refresh_requires_access() {
        let host = Arc::new(GateHost::default());
        *host.access.lock() = LocationAccess::Denied;
        let s = session(host, StaticDirectory::default());
        s.initialize(BaselinePayload::default(), None);

        assert!(matches!(s.refresh().await, FetchOutcome::Skipped));
        assert!(s.last_failure().is_none());
    }

    #[tokio::test]
    async fn test_setup_refresh_never_shares() {
        let host = Arc::new(GateHost::default());
        *host.access.lock() = LocationAccess::Authorized;
        let replica = MemoryReplica::new();
        let config = Config::default();
        let s = BubbleSession::new(SessionParts {
            replica: Arc::new(replica.clone()),
            directory: Arc::new(StaticDirectory {
                me: Some(Participant::new("a")),
                participants: vec![Participant::new("a")],
            }),
            host,
            geolocation: Arc::new(NoLocationService),
            weather: Arc::new(WeatherProvider::new(&config.weather).unwrap()),
            position: PositionOptions::default(),
            links: ProviderLinks::new(&config.weather),
        });

        let mut composed = BaselinePayload::with_uuid("s-1");
        composed.status.location = Some(wunder_weather::Coordinate::new(1.0, 2.0));
        s.mount(BubbleMode::Setup, composed, None);

        assert!(matches!(s.refresh().await, FetchOutcome::Skipped));
        assert!(replica.updates().is_empty());
        assert!(s.last_failure().is_none());
    }

    #[test]
    fn test_share_prompt_depends_on_access() {
        let host = Arc::new(GateHost::default());
        let directory = StaticDirectory {
            me: Some(Participant::new("b")),
            participants: vec![Participant::new("owner"), Participant::new("b")],
        };
        let s = session(host.clone(), directory);
        let mut baseline = BaselinePayload::with_uuid("s-1");
        baseline.status.location = Some(wunder_weather::Coordinate::new(1.0, 2.0));
        s.initialize(baseline, Some("owner".into()));

        let roster = s.roster();
        assert_eq!(s.share_prompt(&roster), SharePrompt::RequestAccess);

        *host.access.lock() = LocationAccess::Authorized;
        assert_eq!(s.share_prompt(&roster), SharePrompt::Share);
    }

    #[test]
    fn test_close_releases_gate() {
        let host = Arc::new(GateHost::default());
        let s = session(host, StaticDirectory::default());
        assert_eq!(s.store().notifier().subscriber_count(), 1);
        s.close();
        assert_eq!(s.store().notifier().subscriber_count(), 0);
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let mut config = Config::default();
        config.weather.request_timeout_secs = 0;
        let runtime = tokio::runtime::Runtime::new().unwrap();

        let result = BubbleSession::from_config(
            &config,
            Arc::new(StaticDirectory::default()),
            Arc::new(GateHost::default()),
            runtime.handle().clone(),
        );
        assert!(matches!(result, Err(AppError::Config(ConfigError::Invalid(_)))));
    }
}
