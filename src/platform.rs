use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Host-side platform discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Alexa,
    BotFramework,
    /// Deprecated alias, reported on the google channel.
    Dialogflow,
    Facebook,
    Google,
}

/// Sub-channel of the collector selected by the `platform` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectorPlatform {
    Alexa,
    Google,
    Facebook,
    Generic,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Alexa,
        Platform::BotFramework,
        Platform::Dialogflow,
        Platform::Facebook,
        Platform::Google,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Alexa => "alexa",
            Platform::BotFramework => "botframework",
            Platform::Dialogflow => "dialogflow",
            Platform::Facebook => "facebook",
            Platform::Google => "google",
        }
    }

    pub fn collector(&self) -> CollectorPlatform {
        match self {
            Platform::Alexa => CollectorPlatform::Alexa,
            Platform::BotFramework => CollectorPlatform::Generic,
            Platform::Dialogflow => CollectorPlatform::Google,
            Platform::Facebook => CollectorPlatform::Facebook,
            Platform::Google => CollectorPlatform::Google,
        }
    }

    /// The one platform whose user storage round-trips through the payload.
    pub fn has_user_storage(&self) -> bool {
        matches!(self, Platform::Google)
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| s.to_string())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CollectorPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectorPlatform::Alexa => "alexa",
            CollectorPlatform::Google => "google",
            CollectorPlatform::Facebook => "facebook",
            CollectorPlatform::Generic => "generic",
        }
    }
}

/// Optional platform lifecycle events a host may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformEvent {
    PlaybackStarted,
    PlaybackFinished,
    PlaybackNearlyFinished,
    PlaybackStopped,
    PlaybackFailed,
    ExceptionEncountered,
    NextCommandIssued,
    PauseCommandIssued,
    PlayCommandIssued,
    PreviousCommandIssued,
    ProactiveSubscriptionChanged,
    SkillAccountLinked,
    SkillEnabled,
    SkillDisabled,
    SkillPermissionAccepted,
    SkillPermissionChanged,
    ListItemsCreated,
    ListItemsUpdated,
    ListItemsDeleted,
    ConnectionsResponse,
    ElementSelected,
    InputHandlerEvent,
    AplUserEvent,
    MessageReceived,
}

impl PlatformEvent {
    pub const CATALOG: [PlatformEvent; 24] = [
        PlatformEvent::PlaybackStarted,
        PlatformEvent::PlaybackFinished,
        PlatformEvent::PlaybackNearlyFinished,
        PlatformEvent::PlaybackStopped,
        PlatformEvent::PlaybackFailed,
        PlatformEvent::ExceptionEncountered,
        PlatformEvent::NextCommandIssued,
        PlatformEvent::PauseCommandIssued,
        PlatformEvent::PlayCommandIssued,
        PlatformEvent::PreviousCommandIssued,
        PlatformEvent::ProactiveSubscriptionChanged,
        PlatformEvent::SkillAccountLinked,
        PlatformEvent::SkillEnabled,
        PlatformEvent::SkillDisabled,
        PlatformEvent::SkillPermissionAccepted,
        PlatformEvent::SkillPermissionChanged,
        PlatformEvent::ListItemsCreated,
        PlatformEvent::ListItemsUpdated,
        PlatformEvent::ListItemsDeleted,
        PlatformEvent::ConnectionsResponse,
        PlatformEvent::ElementSelected,
        PlatformEvent::InputHandlerEvent,
        PlatformEvent::AplUserEvent,
        PlatformEvent::MessageReceived,
    ];

    /// Request type as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            PlatformEvent::PlaybackStarted => "AudioPlayer.PlaybackStarted",
            PlatformEvent::PlaybackFinished => "AudioPlayer.PlaybackFinished",
            PlatformEvent::PlaybackNearlyFinished => "AudioPlayer.PlaybackNearlyFinished",
            PlatformEvent::PlaybackStopped => "AudioPlayer.PlaybackStopped",
            PlatformEvent::PlaybackFailed => "AudioPlayer.PlaybackFailed",
            PlatformEvent::ExceptionEncountered => "System.ExceptionEncountered",
            PlatformEvent::NextCommandIssued => "PlaybackController.NextCommandIssued",
            PlatformEvent::PauseCommandIssued => "PlaybackController.PauseCommandIssued",
            PlatformEvent::PlayCommandIssued => "PlaybackController.PlayCommandIssued",
            PlatformEvent::PreviousCommandIssued => "PlaybackController.PreviousCommandIssued",
            PlatformEvent::ProactiveSubscriptionChanged => {
                "AlexaSkillEvent.ProactiveSubscriptionChanged"
            }
            PlatformEvent::SkillAccountLinked => "AlexaSkillEvent.SkillAccountLinked",
            PlatformEvent::SkillEnabled => "AlexaSkillEvent.SkillEnabled",
            PlatformEvent::SkillDisabled => "AlexaSkillEvent.SkillDisabled",
            PlatformEvent::SkillPermissionAccepted => "AlexaSkillEvent.SkillPermissionAccepted",
            PlatformEvent::SkillPermissionChanged => "AlexaSkillEvent.SkillPermissionChanged",
            PlatformEvent::ListItemsCreated => "AlexaHouseholdListEvent.ItemsCreated",
            PlatformEvent::ListItemsUpdated => "AlexaHouseholdListEvent.ItemsUpdated",
            PlatformEvent::ListItemsDeleted => "AlexaHouseholdListEvent.ItemsDeleted",
            PlatformEvent::ConnectionsResponse => "Connections.Response",
            PlatformEvent::ElementSelected => "Display.ElementSelected",
            PlatformEvent::InputHandlerEvent => "GameEngine.InputHandlerEvent",
            PlatformEvent::AplUserEvent => "Alexa.Presentation.APL.UserEvent",
            PlatformEvent::MessageReceived => "Messaging.MessageReceived",
        }
    }

    /// Host registration method name, e.g. `onAudioPlayerPlaybackStarted`.
    pub fn registration_name(&self) -> String {
        format!("on{}", self.name().replace('.', ""))
    }

    pub fn from_request_type(request_type: &str) -> Option<Self> {
        Self::CATALOG.iter().copied().find(|e| e.name() == request_type)
    }
}
