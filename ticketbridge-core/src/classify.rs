//! Keyword classification
//!
//! Case-insensitive substring scan over ordered rule tables. The first rule
//! with a matching keyword wins; rule order is the priority order.

use crate::enums::{Category, EscalationReason};

/// A classification rule: the value to return and the keywords that select it.
pub type Rule<T> = (T, &'static [&'static str]);

/// Category rules in priority order. `Unknown` is the fallback.
pub const CATEGORY_RULES: &[Rule<Category>] = &[
    (
        Category::Outage,
        &[
            "outage",
            "no internet",
            "internet down",
            "internet is down",
            "service down",
            "offline",
            "no service",
            "no connection",
            "area down",
        ],
    ),
    (
        Category::WiFi,
        &["wifi", "wi-fi", "wireless", "router", "signal", "ssid"],
    ),
    (
        Category::Cgnat,
        &[
            "cgnat",
            "cg-nat",
            "carrier grade nat",
            "carrier-grade",
            "port forward",
            "port-forward",
            "public ip",
            "static ip",
            "double nat",
        ],
    ),
    (
        Category::Wiring,
        &["wiring", "cabling", "cable", "ethernet", "jack", "wire"],
    ),
    (
        Category::EquipmentReturn,
        &[
            "return equipment",
            "equipment return",
            "returning",
            "send back",
            "ship back",
            "return label",
            "return the",
        ],
    ),
];

/// Escalation reason rules in priority order. `Other` is the fallback.
pub const REASON_RULES: &[Rule<EscalationReason>] = &[
    (
        EscalationReason::CallerRequested,
        &[
            "speak to a human",
            "talk to a person",
            "real person",
            "representative",
            "supervisor",
            "manager",
            "human",
            "agent",
        ],
    ),
    (
        EscalationReason::SafetyRisk,
        &[
            "fire",
            "smoke",
            "spark",
            "electrical hazard",
            "shock",
            "downed line",
            "live wire",
            "danger",
            "unsafe",
        ],
    ),
    (
        EscalationReason::BillingOrAccount,
        &[
            "billing",
            "bill",
            "charge",
            "invoice",
            "payment",
            "refund",
            "account",
            "overcharged",
        ],
    ),
    (
        EscalationReason::TwoStepsNoResolve,
        &[
            "still not working",
            "tried rebooting",
            "didn't help",
            "did not help",
            "no resolution",
            "still down",
            "troubleshooting failed",
            "restarted",
        ],
    ),
    (
        EscalationReason::OutOfScope,
        &["out of scope", "not supported", "unrelated"],
    ),
];

fn first_match<T: Copy>(rules: &[Rule<T>], text: &str, fallback: T) -> T {
    let haystack = text.to_lowercase();
    rules
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| haystack.contains(k)))
        .map(|(value, _)| *value)
        .unwrap_or(fallback)
}

/// Infer a category from free text.
pub fn infer_category(text: &str) -> Category {
    first_match(CATEGORY_RULES, text, Category::Unknown)
}

/// Infer an escalation reason from free text.
pub fn infer_escalation_reason(text: &str) -> EscalationReason {
    first_match(REASON_RULES, text, EscalationReason::Other)
}
