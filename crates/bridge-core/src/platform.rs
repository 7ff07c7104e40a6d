//! Supported messaging platforms and their per-platform page profiles.
//!
//! A [`PlatformProfile`] is plain data: the URL to open and the CSS
//! selectors used to recognise each login phase. The session state machine
//! only ever consults the profile, so it stays platform-agnostic.

use crate::error::BridgeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A messaging platform reachable through browser automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    WhatsApp,
    Telegram,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::WhatsApp, Platform::Telegram];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::WhatsApp => "whatsapp",
            Platform::Telegram => "telegram",
        }
    }

    /// Prefix used for session identifiers on this platform.
    pub fn id_prefix(self) -> &'static str {
        match self {
            Platform::WhatsApp => "wa",
            Platform::Telegram => "tg",
        }
    }

    /// Built-in page profile for this platform.
    pub fn default_profile(self) -> PlatformProfile {
        match self {
            Platform::WhatsApp => PlatformProfile {
                url: "https://web.whatsapp.com".to_string(),
                login_prompt: "div[data-ref]".to_string(),
                credential: "div[data-ref] canvas".to_string(),
                authenticated: "#pane-side".to_string(),
                profile_name: "header [data-testid=\"conversation-info-header-chat-title\"]"
                    .to_string(),
                item: "#pane-side [role=\"listitem\"]".to_string(),
                instructions: vec![
                    "Open WhatsApp on your phone".to_string(),
                    "Tap Menu or Settings and select Linked Devices".to_string(),
                    "Tap Link a Device".to_string(),
                    "Point your phone at this screen to scan the QR code".to_string(),
                ],
            },
            Platform::Telegram => PlatformProfile {
                url: "https://web.telegram.org/k/".to_string(),
                login_prompt: ".qr-container".to_string(),
                credential: ".qr-container canvas".to_string(),
                authenticated: ".chatlist-container".to_string(),
                profile_name: ".sidebar-header .peer-title".to_string(),
                item: ".chatlist-chat".to_string(),
                instructions: vec![
                    "Open Telegram on your phone".to_string(),
                    "Go to Settings > Devices > Link Desktop Device".to_string(),
                    "Scan the QR code shown on this screen".to_string(),
                ],
            },
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "whatsapp" | "wa" => Ok(Platform::WhatsApp),
            "telegram" | "tg" => Ok(Platform::Telegram),
            other => Err(BridgeError::UnsupportedPlatform(other.to_string())),
        }
    }
}

/// Page locations and selectors for one platform's web client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformProfile {
    /// Page to open when a session starts.
    pub url: String,
    /// Present once the login step (QR or phone code) is on screen.
    pub login_prompt: String,
    /// Element rendered as the credential artifact.
    pub credential: String,
    /// Present only after the user is logged in.
    pub authenticated: String,
    /// Best-effort source of the account display name.
    pub profile_name: String,
    /// One element per recent conversation.
    pub item: String,
    /// Human-readable steps shown to the user while linking.
    pub instructions: Vec<String>,
}

/// Partial override of a [`PlatformProfile`], as read from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileOverride {
    pub url: Option<String>,
    pub login_prompt: Option<String>,
    pub credential: Option<String>,
    pub authenticated: Option<String>,
    pub profile_name: Option<String>,
    pub item: Option<String>,
    pub instructions: Option<Vec<String>>,
}

impl PlatformProfile {
    /// Apply the fields set in `over`, keeping everything else.
    pub fn merged(mut self, over: &ProfileOverride) -> Self {
        if let Some(v) = &over.url {
            self.url = v.clone();
        }
        if let Some(v) = &over.login_prompt {
            self.login_prompt = v.clone();
        }
        if let Some(v) = &over.credential {
            self.credential = v.clone();
        }
        if let Some(v) = &over.authenticated {
            self.authenticated = v.clone();
        }
        if let Some(v) = &over.profile_name {
            self.profile_name = v.clone();
        }
        if let Some(v) = &over.item {
            self.item = v.clone();
        }
        if let Some(v) = &over.instructions {
            self.instructions = v.clone();
        }
        self
    }
}
