//! Wire event parsing.
//!
//! Telephony callbacks arrive url-encoded, payment events as JSON. Both
//! are parsed into closed enums so dispatch is exhaustive; anything the
//! provider sends that this service does not understand lands in an
//! explicit `Unknown` variant rather than being dropped silently.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use frontdesk_store::SubscriptionStatus;

/// Decode an application/x-www-form-urlencoded body into key/value
/// pairs, preserving order. Undecodable pairs are skipped.
pub fn parse_form(body: &str) -> Vec<(String, String)> {
    body.split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = urlencoding::decode(key).ok()?;
            let value = value.replace('+', " ");
            let value = urlencoding::decode(&value).ok()?;
            Some((key.into_owned(), value.into_owned()))
        })
        .collect()
}

pub fn form_value<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Telephony call lifecycle status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Initiated,
    Ringing,
    Answered,
    InProgress,
    Completed,
    Busy,
    Failed,
    NoAnswer,
    Canceled,
    Other,
}

impl CallStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "initiated" => Self::Initiated,
            "ringing" => Self::Ringing,
            "answered" => Self::Answered,
            "in-progress" => Self::InProgress,
            "completed" => Self::Completed,
            "busy" => Self::Busy,
            "failed" => Self::Failed,
            "no-answer" => Self::NoAnswer,
            "canceled" => Self::Canceled,
            _ => Self::Other,
        }
    }

    /// Terminal statuses stamp completed_at on test calls.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Busy | Self::Failed | Self::NoAnswer | Self::Canceled
        )
    }
}

/// One parsed telephony status callback.
#[derive(Debug, Clone)]
pub struct CallStatusEvent {
    pub call_sid: String,
    pub raw_status: String,
    pub status: CallStatus,
    pub from: String,
    pub to: String,
    pub direction: String,
    pub duration_seconds: Option<i32>,
    pub recording_url: Option<String>,
}

impl CallStatusEvent {
    /// Build from decoded form parameters. CallSid and CallStatus are
    /// mandatory; everything else is optional on the wire.
    pub fn from_params(params: &[(String, String)]) -> Option<Self> {
        let call_sid = form_value(params, "CallSid")?.to_string();
        let raw_status = form_value(params, "CallStatus")?.to_string();

        Some(Self {
            status: CallStatus::parse(&raw_status),
            call_sid,
            raw_status,
            from: form_value(params, "From").unwrap_or("").to_string(),
            to: form_value(params, "To").unwrap_or("").to_string(),
            direction: form_value(params, "Direction").unwrap_or("inbound").to_string(),
            duration_seconds: form_value(params, "Duration").and_then(|d| d.parse().ok()),
            recording_url: form_value(params, "RecordingUrl").map(str::to_string),
        })
    }

    /// The provisioned platform number involved in this call: the
    /// called number for inbound calls, the calling number otherwise.
    pub fn provisioned_number(&self) -> &str {
        if self.direction == "inbound" {
            &self.to
        } else {
            &self.from
        }
    }

    /// The external party's number, mirror of [`provisioned_number`].
    ///
    /// [`provisioned_number`]: Self::provisioned_number
    pub fn caller_number(&self) -> &str {
        if self.direction == "inbound" {
            &self.from
        } else {
            &self.to
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceEvent {
    /// Invoices not tied to a subscription are acknowledged and skipped.
    pub subscription: Option<String>,
    period_start: i64,
    period_end: i64,
}

impl InvoiceEvent {
    pub fn period_start(&self) -> DateTime<Utc> {
        from_unix(self.period_start)
    }

    pub fn period_end(&self) -> DateTime<Utc> {
        from_unix(self.period_end)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionEvent {
    pub id: String,
    pub status: String,
    current_period_start: i64,
    current_period_end: i64,
    trial_end: Option<i64>,
}

impl SubscriptionEvent {
    pub fn mapped_status(&self) -> SubscriptionStatus {
        map_provider_status(&self.status)
    }

    pub fn period_start(&self) -> DateTime<Utc> {
        from_unix(self.current_period_start)
    }

    pub fn period_end(&self) -> DateTime<Utc> {
        from_unix(self.current_period_end)
    }

    pub fn trial_end(&self) -> Option<DateTime<Utc>> {
        self.trial_end.map(from_unix)
    }
}

/// Payment provider events this platform reacts to.
#[derive(Debug, Clone)]
pub enum PaymentEvent {
    PaymentSucceeded(InvoiceEvent),
    PaymentFailed(InvoiceEvent),
    SubscriptionUpdated(SubscriptionEvent),
    SubscriptionDeleted(SubscriptionEvent),
    /// Anything else the provider is configured to send.
    Unknown(String),
}

impl PaymentEvent {
    pub fn parse(raw_body: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        struct RawEvent {
            #[serde(rename = "type")]
            kind: String,
            data: RawData,
        }

        #[derive(Deserialize)]
        struct RawData {
            object: serde_json::Value,
        }

        let raw: RawEvent = serde_json::from_str(raw_body)?;

        Ok(match raw.kind.as_str() {
            "invoice.payment_succeeded" => {
                Self::PaymentSucceeded(serde_json::from_value(raw.data.object)?)
            }
            "invoice.payment_failed" => {
                Self::PaymentFailed(serde_json::from_value(raw.data.object)?)
            }
            "customer.subscription.updated" => {
                Self::SubscriptionUpdated(serde_json::from_value(raw.data.object)?)
            }
            "customer.subscription.deleted" => {
                Self::SubscriptionDeleted(serde_json::from_value(raw.data.object)?)
            }
            _ => Self::Unknown(raw.kind),
        })
    }
}

/// Map the payment provider's subscription vocabulary onto ours.
/// Unrecognized statuses default to active, matching the provider's
/// own treatment of newly introduced states.
pub fn map_provider_status(status: &str) -> SubscriptionStatus {
    match status {
        "past_due" => SubscriptionStatus::PastDue,
        "canceled" => SubscriptionStatus::Cancelled,
        "unpaid" => SubscriptionStatus::Unpaid,
        "trialing" => SubscriptionStatus::Trialing,
        _ => SubscriptionStatus::Active,
    }
}

fn from_unix(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_decoding_handles_percent_and_plus() {
        let params = parse_form("CallSid=CA123&From=%2B34911222333&City=San+Sebasti%C3%A1n");
        assert_eq!(form_value(&params, "CallSid"), Some("CA123"));
        assert_eq!(form_value(&params, "From"), Some("+34911222333"));
        assert_eq!(form_value(&params, "City"), Some("San Sebastián"));
        assert_eq!(form_value(&params, "Missing"), None);
    }

    #[test]
    fn call_event_requires_sid_and_status() {
        assert!(CallStatusEvent::from_params(&parse_form("CallStatus=ringing")).is_none());

        let event =
            CallStatusEvent::from_params(&parse_form("CallSid=CA1&CallStatus=completed&Duration=62"))
                .unwrap();
        assert_eq!(event.status, CallStatus::Completed);
        assert_eq!(event.duration_seconds, Some(62));
        assert!(event.recording_url.is_none());
    }

    #[test]
    fn provisioned_number_follows_direction() {
        let inbound = CallStatusEvent::from_params(&parse_form(
            "CallSid=CA1&CallStatus=completed&From=%2B34600111222&To=%2B34911000111&Direction=inbound",
        ))
        .unwrap();
        assert_eq!(inbound.provisioned_number(), "+34911000111");
        assert_eq!(inbound.caller_number(), "+34600111222");

        let outbound = CallStatusEvent::from_params(&parse_form(
            "CallSid=CA2&CallStatus=completed&From=%2B34911000111&To=%2B34600111222&Direction=outbound-api",
        ))
        .unwrap();
        assert_eq!(outbound.provisioned_number(), "+34911000111");
        assert_eq!(outbound.caller_number(), "+34600111222");
    }

    #[test]
    fn terminal_statuses() {
        for s in ["completed", "busy", "failed", "no-answer", "canceled"] {
            assert!(CallStatus::parse(s).is_terminal(), "{s} should be terminal");
        }
        for s in ["initiated", "ringing", "answered", "in-progress", "weird"] {
            assert!(!CallStatus::parse(s).is_terminal(), "{s} should not be terminal");
        }
    }

    #[test]
    fn payment_event_dispatch() {
        let body = r#"{
            "type": "invoice.payment_succeeded",
            "data": {"object": {"subscription": "sub_1", "period_start": 1700000000, "period_end": 1702592000}}
        }"#;
        let event = PaymentEvent::parse(body).unwrap();
        match event {
            PaymentEvent::PaymentSucceeded(invoice) => {
                assert_eq!(invoice.subscription.as_deref(), Some("sub_1"));
                assert_eq!(invoice.period_start().timestamp(), 1_700_000_000);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn subscription_event_carries_trial_end() {
        let body = r#"{
            "type": "customer.subscription.updated",
            "data": {"object": {
                "id": "sub_2", "status": "trialing",
                "current_period_start": 1700000000, "current_period_end": 1702592000,
                "trial_end": 1701000000
            }}
        }"#;
        match PaymentEvent::parse(body).unwrap() {
            PaymentEvent::SubscriptionUpdated(sub) => {
                assert_eq!(sub.mapped_status(), SubscriptionStatus::Trialing);
                assert_eq!(sub.trial_end().unwrap().timestamp(), 1_701_000_000);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn unrecognized_event_types_are_preserved() {
        let body = r#"{"type": "charge.refunded", "data": {"object": {}}}"#;
        match PaymentEvent::parse(body).unwrap() {
            PaymentEvent::Unknown(kind) => assert_eq!(kind, "charge.refunded"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn provider_status_vocabulary() {
        assert_eq!(map_provider_status("active"), SubscriptionStatus::Active);
        assert_eq!(map_provider_status("past_due"), SubscriptionStatus::PastDue);
        assert_eq!(map_provider_status("canceled"), SubscriptionStatus::Cancelled);
        assert_eq!(map_provider_status("unpaid"), SubscriptionStatus::Unpaid);
        assert_eq!(map_provider_status("trialing"), SubscriptionStatus::Trialing);
        // Provider-side additions degrade to active.
        assert_eq!(map_provider_status("incomplete"), SubscriptionStatus::Active);
    }

    #[test]
    fn redelivered_subscription_event_converges() {
        // The provider redelivers the same signed body on a 500. Both
        // deliveries must drive the repository with identical values,
        // so re-applying the update leaves the row unchanged.
        let body = r#"{
            "type": "customer.subscription.updated",
            "data": {"object": {
                "id": "sub_3", "status": "past_due",
                "current_period_start": 1700000000, "current_period_end": 1702592000
            }}
        }"#;

        let first = match PaymentEvent::parse(body).unwrap() {
            PaymentEvent::SubscriptionUpdated(sub) => sub,
            other => panic!("unexpected event: {:?}", other),
        };
        let replay = match PaymentEvent::parse(body).unwrap() {
            PaymentEvent::SubscriptionUpdated(sub) => sub,
            other => panic!("unexpected event: {:?}", other),
        };

        assert_eq!(first.id, replay.id);
        assert_eq!(first.mapped_status(), replay.mapped_status());
        assert_eq!(first.mapped_status(), SubscriptionStatus::PastDue);
        assert_eq!(first.period_start(), replay.period_start());
        assert_eq!(first.period_end(), replay.period_end());
        assert_eq!(first.trial_end(), replay.trial_end());
    }
}
