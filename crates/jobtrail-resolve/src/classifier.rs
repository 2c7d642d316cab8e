//! Deterministic content classifier.
//!
//! An ordered decision list over lowercased subject/body/sender text: each
//! rule either assigns a category or passes to the next, first match wins.
//! The ordering is load-bearing — rejection and offer checks run before the
//! broader interview/outreach checks, since rejection emails frequently
//! reference "interview" without scheduling one.

use jobtrail_core::MessageCategory;

/// Lowercased views of the message text, shared by every rule.
#[derive(Debug)]
pub struct EmailText {
    pub subject: String,
    pub body: String,
    pub from: String,
    /// subject + body concatenated, for phrase checks spanning either.
    combined: String,
}

impl EmailText {
    pub fn new(subject: &str, body: &str, from: &str) -> Self {
        let subject = subject.to_lowercase();
        let body = body.to_lowercase();
        Self {
            combined: format!("{subject} {body}"),
            subject,
            body,
            from: from.to_lowercase(),
        }
    }

    fn has(&self, phrase: &str) -> bool {
        self.combined.contains(phrase)
    }

    fn has_any(&self, phrases: &[&str]) -> bool {
        phrases.iter().any(|p| self.has(p))
    }
}

/// One step of the decision list: a named predicate that may assign a
/// category.
pub struct Rule {
    pub name: &'static str,
    pub apply: fn(&EmailText) -> Option<MessageCategory>,
}

const REJECTION_PHRASES: &[&str] = &[
    "not moving forward",
    "not be moving forward",
    "decided to move forward with other",
    "other candidates",
    "unfortunately",
    "not selected",
    "position has been filled",
    "pursue other applicants",
    "will not be progressing",
];

const OFFER_PHRASES: &[&str] = &[
    "offer letter",
    "compensation package",
    "pleased to offer",
    "excited to offer",
    "extend an offer",
    "formal offer",
];

const NEGOTIATION_PHRASES: &[&str] = &[
    "counter",
    "negotiate",
    "negotiation",
    "revised offer",
    "signing bonus",
];

const INTERVIEW_PHRASES: &[&str] = &[
    "interview",
    "onsite",
    "on-site",
    "phone screen",
    "technical screen",
    "schedule a call",
    "schedule a time",
    "availability",
];

const CONFIRMATION_PHRASES: &[&str] = &[
    "application received",
    "application confirmed",
    "received your application",
    "thank you for applying",
    "thanks for applying",
    "application has been submitted",
];

const OUTREACH_PHRASES: &[&str] = &[
    "came across your profile",
    "reaching out",
    "love to connect",
    "your background",
    "impressed by your experience",
];

const FOLLOW_UP_PHRASES: &[&str] = &["checking in", "following up", "follow up", "follow-up"];

fn offer_language_present(text: &EmailText) -> bool {
    text.has_any(OFFER_PHRASES) || text.subject.contains("offer")
}

fn rule_newsletter_spam(text: &EmailText) -> Option<MessageCategory> {
    let no_reply = text.from.contains("no-reply") || text.from.contains("noreply");
    let unsubscribe = text.has("unsubscribe");
    if no_reply && (unsubscribe || text.has("job alert") || text.has("jobs for you")) {
        return Some(MessageCategory::Newsletter);
    }
    // Unsubscribe language plus generic "opportunities" phrasing, absent any
    // interview context, is bulk mail even from a reply-able sender.
    if unsubscribe && text.has("opportunities") && !text.has("interview") {
        return Some(MessageCategory::Spam);
    }
    None
}

fn rule_rejection(text: &EmailText) -> Option<MessageCategory> {
    if !text.has_any(REJECTION_PHRASES) {
        return None;
    }
    // Heuristic tie-break preserved from the source behavior: unambiguous
    // offer language wins over superficially negative framing
    // ("unfortunately we can only offer...").
    if offer_language_present(text) {
        return Some(MessageCategory::Offer);
    }
    Some(MessageCategory::Rejection)
}

fn rule_offer(text: &EmailText) -> Option<MessageCategory> {
    offer_language_present(text).then_some(MessageCategory::Offer)
}

fn rule_negotiation(text: &EmailText) -> Option<MessageCategory> {
    text.has_any(NEGOTIATION_PHRASES)
        .then_some(MessageCategory::Negotiation)
}

fn rule_interview(text: &EmailText) -> Option<MessageCategory> {
    text.has_any(INTERVIEW_PHRASES)
        .then_some(MessageCategory::InterviewScheduling)
}

fn rule_confirmation(text: &EmailText) -> Option<MessageCategory> {
    text.has_any(CONFIRMATION_PHRASES)
        .then_some(MessageCategory::Confirmation)
}

fn rule_outreach(text: &EmailText) -> Option<MessageCategory> {
    text.has_any(OUTREACH_PHRASES)
        .then_some(MessageCategory::RecruiterOutreach)
}

fn rule_follow_up(text: &EmailText) -> Option<MessageCategory> {
    text.has_any(FOLLOW_UP_PHRASES)
        .then_some(MessageCategory::FollowUp)
}

/// The decision list, in evaluation order.
pub const RULES: &[Rule] = &[
    Rule {
        name: "newsletter_spam",
        apply: rule_newsletter_spam,
    },
    Rule {
        name: "rejection",
        apply: rule_rejection,
    },
    Rule {
        name: "offer",
        apply: rule_offer,
    },
    Rule {
        name: "negotiation",
        apply: rule_negotiation,
    },
    Rule {
        name: "interview_scheduling",
        apply: rule_interview,
    },
    Rule {
        name: "confirmation",
        apply: rule_confirmation,
    },
    Rule {
        name: "recruiter_outreach",
        apply: rule_outreach,
    },
    Rule {
        name: "follow_up",
        apply: rule_follow_up,
    },
];

/// Assign a category to a message. Pure and deterministic: the same input
/// always yields the same category.
pub fn classify(subject: &str, body: &str, from: &str) -> MessageCategory {
    let text = EmailText::new(subject, body, from);
    for rule in RULES {
        if let Some(category) = (rule.apply)(&text) {
            return category;
        }
    }
    MessageCategory::General
}

#[cfg(test)]
mod tests {
    use super::*;
    use MessageCategory::*;

    #[test]
    fn test_interview_scheduling() {
        assert_eq!(
            classify(
                "Interview scheduling — next week",
                "We'd like to set up a time",
                "jane@acme.io"
            ),
            InterviewScheduling
        );
    }

    #[test]
    fn test_rejection_mentioning_interview() {
        // Ordering-sensitive: rejection phrasing wins even though the body
        // references the interview.
        assert_eq!(
            classify(
                "Your application",
                "Thank you for taking the time to interview. Unfortunately we \
                 have decided to move forward with other candidates.",
                "recruiting@acme.io"
            ),
            Rejection
        );
    }

    #[test]
    fn test_offer_overrides_rejection_phrasing() {
        // The key tie-break: rejection phrasing AND unambiguous offer
        // language classifies as offer.
        assert_eq!(
            classify(
                "Update on your application",
                "Unfortunately we could not match your requested level, but we \
                 are pleased to offer you the role. Your offer letter is attached.",
                "hr@acme.io"
            ),
            Offer
        );
    }

    #[test]
    fn test_offer_in_subject() {
        assert_eq!(
            classify("Your offer from Acme", "Details inside", "hr@acme.io"),
            Offer
        );
    }

    #[test]
    fn test_negotiation() {
        assert_eq!(
            classify(
                "Re: offer discussion",
                "I'd like to negotiate the signing bonus",
                "me@me.dev"
            ),
            // "offer" in subject wins first — evaluation order is fixed.
            Offer
        );
        assert_eq!(
            classify(
                "Re: next steps",
                "Could we discuss a revised compensation? I'd like to counter.",
                "me@me.dev"
            ),
            Negotiation
        );
    }

    #[test]
    fn test_newsletter_no_reply_job_alert() {
        assert_eq!(
            classify(
                "New jobs for you",
                "Your weekly job alert. Unsubscribe here.",
                "no-reply@jobs.example.com"
            ),
            Newsletter
        );
    }

    #[test]
    fn test_spam_unsubscribe_opportunities() {
        assert_eq!(
            classify(
                "Exciting opportunities await",
                "We have many opportunities for someone like you. Unsubscribe.",
                "growth@agency.example"
            ),
            Spam
        );
    }

    #[test]
    fn test_unsubscribe_with_interview_context_not_spam() {
        assert_eq!(
            classify(
                "Interview confirmation",
                "Your interview is scheduled. Unsubscribe from notifications. \
                 More opportunities on our careers page.",
                "talent@acme.io"
            ),
            InterviewScheduling
        );
    }

    #[test]
    fn test_confirmation() {
        assert_eq!(
            classify(
                "We received your application",
                "Thank you for applying to Acme. Your application has been submitted.",
                "jobs@acme.io"
            ),
            Confirmation
        );
    }

    #[test]
    fn test_recruiter_outreach() {
        assert_eq!(
            classify(
                "Opportunity at Globex",
                "I came across your profile and would love to connect.",
                "scout@agency.example"
            ),
            RecruiterOutreach
        );
    }

    #[test]
    fn test_follow_up() {
        assert_eq!(
            classify("Re: Acme role", "Just checking in on my application status.", "me@me.dev"),
            FollowUp
        );
    }

    #[test]
    fn test_default_general() {
        assert_eq!(
            classify("Hello", "Nice meeting you at the conference.", "person@acme.io"),
            General
        );
    }

    #[test]
    fn test_classifier_idempotent() {
        let subject = "Interview scheduling — next week";
        let body = "We'd like to set up a phone screen.";
        let from = "jane@acme.io";
        let first = classify(subject, body, from);
        let second = classify(subject, body, from);
        assert_eq!(first, second);
    }

    #[test]
    fn test_rule_order_is_fixed() {
        let names: Vec<&str> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "newsletter_spam",
                "rejection",
                "offer",
                "negotiation",
                "interview_scheduling",
                "confirmation",
                "recruiter_outreach",
                "follow_up",
            ]
        );
    }
}
