//! Render logged ICEPAY postbacks for the order history shown to organizers.

use crate::i18n::{Locale, Message};
use crate::orders::LogEntry;
use crate::payments::providers::icepay::reconcile::LOG_ACTION_TYPE;
use crate::payments::providers::icepay::IcepayStatus;

/// Human readable line for a log entry, or `None` if it is not ours.
pub fn display(entry: &LogEntry, locale: Locale) -> Option<String> {
    if entry.action_type != LOG_ACTION_TYPE {
        return None;
    }

    let field = |name: &str| entry.data.get(name).and_then(|v| v.as_str()).unwrap_or_default();
    let reason = field("StatusCode");

    let text = match IcepayStatus::from_code(field("Status")) {
        IcepayStatus::Ok => Message::EventPaid.text(locale).to_string(),
        IcepayStatus::Open => Message::EventPending.text(locale).to_string(),
        IcepayStatus::Err => Message::EventFailed.format(locale, reason),
        IcepayStatus::Refund => Message::EventRefunded.text(locale).to_string(),
        IcepayStatus::Chargeback => Message::EventChargeback.format(locale, reason),
        IcepayStatus::Other(_) => return None,
    };

    Some(Message::ReportedEvent.format(locale, &text))
}
