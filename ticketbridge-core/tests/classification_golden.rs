//! Golden cases for keyword classification.

use ticketbridge_core::{infer_category, infer_escalation_reason, Category, EscalationReason};

#[test]
fn golden_categories() {
    let cases = [
        ("Total outage on Elm street since 6am", Category::Outage),
        ("caller has no internet at all", Category::Outage),
        ("modem shows offline, wifi light off", Category::Outage),
        ("WiFi is slow upstairs", Category::WiFi),
        ("Wi-Fi password reset", Category::WiFi),
        ("router keeps rebooting", Category::WiFi),
        ("weak signal in the garage", Category::WiFi),
        ("needs port forwarding for a game server", Category::Cgnat),
        ("behind CGNAT, wants a public IP", Category::Cgnat),
        ("ethernet jack in office is loose", Category::Wiring),
        ("coax cable chewed by dog", Category::Wiring),
        ("moving out, returning the modem", Category::EquipmentReturn),
        ("needs a return label for the ONT", Category::EquipmentReturn),
        ("wants to change appointment time", Category::Unknown),
        ("", Category::Unknown),
    ];

    for (text, expected) in cases {
        assert_eq!(infer_category(text), expected, "text: {:?}", text);
    }
}

#[test]
fn golden_escalation_reasons() {
    let cases = [
        ("caller asked to speak to a human", EscalationReason::CallerRequested),
        ("wants a supervisor right now", EscalationReason::CallerRequested),
        ("smoke coming from the outlet", EscalationReason::SafetyRisk),
        ("downed line across the driveway", EscalationReason::SafetyRisk),
        ("disputes last month's bill", EscalationReason::BillingOrAccount),
        ("needs a refund", EscalationReason::BillingOrAccount),
        ("tried rebooting twice, still not working", EscalationReason::TwoStepsNoResolve),
        ("power cycle did not help", EscalationReason::TwoStepsNoResolve),
        ("question is unrelated to internet service", EscalationReason::OutOfScope),
        ("general question", EscalationReason::Other),
    ];

    for (text, expected) in cases {
        assert_eq!(infer_escalation_reason(text), expected, "text: {:?}", text);
    }
}

#[test]
fn golden_reason_priority() {
    // Caller request outranks safety, safety outranks billing.
    assert_eq!(
        infer_escalation_reason("sparks from the box, put me through to a manager"),
        EscalationReason::CallerRequested
    );
    assert_eq!(
        infer_escalation_reason("billing question but there is smoke"),
        EscalationReason::SafetyRisk
    );
}
