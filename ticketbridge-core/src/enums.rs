//! Enum types for escalations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Problem category of an escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Category {
    Outage,
    WiFi,
    #[serde(rename = "CGNAT")]
    Cgnat,
    Wiring,
    EquipmentReturn,
    #[default]
    Unknown,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Outage,
        Category::WiFi,
        Category::Cgnat,
        Category::Wiring,
        Category::EquipmentReturn,
        Category::Unknown,
    ];

    /// Wire representation, as it appears in notes and JSON bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Outage => "Outage",
            Category::WiFi => "WiFi",
            Category::Cgnat => "CGNAT",
            Category::Wiring => "Wiring",
            Category::EquipmentReturn => "EquipmentReturn",
            Category::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "outage" => Ok(Category::Outage),
            "wifi" => Ok(Category::WiFi),
            "cgnat" => Ok(Category::Cgnat),
            "wiring" => Ok(Category::Wiring),
            "equipmentreturn" => Ok(Category::EquipmentReturn),
            "unknown" => Ok(Category::Unknown),
            _ => Err(EnumParseError::new("category", s)),
        }
    }
}

/// Why the caller was escalated to a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum EscalationReason {
    CallerRequested,
    TwoStepsNoResolve,
    OutOfScope,
    SafetyRisk,
    BillingOrAccount,
    #[default]
    Other,
}

impl EscalationReason {
    pub const ALL: [EscalationReason; 6] = [
        EscalationReason::CallerRequested,
        EscalationReason::TwoStepsNoResolve,
        EscalationReason::OutOfScope,
        EscalationReason::SafetyRisk,
        EscalationReason::BillingOrAccount,
        EscalationReason::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationReason::CallerRequested => "CallerRequested",
            EscalationReason::TwoStepsNoResolve => "TwoStepsNoResolve",
            EscalationReason::OutOfScope => "OutOfScope",
            EscalationReason::SafetyRisk => "SafetyRisk",
            EscalationReason::BillingOrAccount => "BillingOrAccount",
            EscalationReason::Other => "Other",
        }
    }
}

impl fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EscalationReason {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "callerrequested" => Ok(EscalationReason::CallerRequested),
            "twostepsnoresolve" => Ok(EscalationReason::TwoStepsNoResolve),
            "outofscope" => Ok(EscalationReason::OutOfScope),
            "safetyrisk" => Ok(EscalationReason::SafetyRisk),
            "billingoraccount" => Ok(EscalationReason::BillingOrAccount),
            "other" => Ok(EscalationReason::Other),
            _ => Err(EnumParseError::new("escalation reason", s)),
        }
    }
}

/// Which upstream assistant produced the escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Source {
    VoiceAgent,
    DesktopAssistant,
    #[default]
    Other,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::VoiceAgent => "VoiceAgent",
            Source::DesktopAssistant => "DesktopAssistant",
            Source::Other => "Other",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Source {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "voiceagent" => Ok(Source::VoiceAgent),
            "desktopassistant" => Ok(Source::DesktopAssistant),
            "other" => Ok(Source::Other),
            _ => Err(EnumParseError::new("source", s)),
        }
    }
}

/// Error when parsing an unrecognised enum string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumParseError {
    pub kind: &'static str,
    pub value: String,
}

impl EnumParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for EnumParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for EnumParseError {}

fn normalize_token(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
