//! User-facing messages in the languages the checkout supports.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Nl,
    De,
}

impl Locale {
    /// Two-letter language code, lowercase.
    pub fn code(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Nl => "nl",
            Locale::De => "de",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let primary = code.split(['-', '_']).next().unwrap_or_default();
        match primary.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Locale::En),
            "nl" => Some(Locale::Nl),
            "de" => Some(Locale::De),
            _ => None,
        }
    }

    /// Pick the best supported locale from an `Accept-Language` header value.
    ///
    /// Entries are tried by descending quality; ties keep header order.
    pub fn negotiate(accept_language: Option<&str>) -> Self {
        let Some(header) = accept_language else {
            return Locale::default();
        };

        let mut candidates: Vec<(f32, usize, &str)> = header
            .split(',')
            .enumerate()
            .filter_map(|(position, entry)| {
                let mut parts = entry.trim().split(';');
                let tag = parts.next()?.trim();
                if tag.is_empty() {
                    return None;
                }
                let quality = parts
                    .find_map(|p| p.trim().strip_prefix("q="))
                    .and_then(|q| q.parse::<f32>().ok())
                    .unwrap_or(1.0);
                Some((quality, position, tag))
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });

        candidates
            .into_iter()
            .filter(|(quality, _, _)| *quality > 0.0)
            .find_map(|(_, _, tag)| Locale::from_code(tag))
            .unwrap_or_default()
    }
}

/// Catalog of messages shown to buyers and organizers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    GatewayUnavailable,
    PaymentFailed,
    QuotaExceeded,
    ChooseIssuer,
    YourBank,
    OrderNotFound,
    OrderNotPayable,
    TryAgainLater,
    MerchantIdLabel,
    SecretCodeLabel,
    IdealBankLabel,
    VerboseName,
    ReportedEvent,
    EventPaid,
    EventPending,
    EventFailed,
    EventRefunded,
    EventChargeback,
}

impl Message {
    /// Text with the first `{}` placeholder replaced by `arg`.
    pub fn format(&self, locale: Locale, arg: &str) -> String {
        self.text(locale).replacen("{}", arg, 1)
    }

    pub fn text(&self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Message::GatewayUnavailable, Locale::En) => {
                "We had trouble communicating with ICEPAY. Please try again and contact support if the problem persists."
            }
            (Message::GatewayUnavailable, Locale::Nl) => {
                "We konden geen verbinding maken met ICEPAY. Probeer het opnieuw en neem contact op met de klantenservice als het probleem aanhoudt."
            }
            (Message::GatewayUnavailable, Locale::De) => {
                "Bei der Kommunikation mit ICEPAY ist ein Fehler aufgetreten. Bitte versuchen Sie es erneut und kontaktieren Sie den Support, falls das Problem bestehen bleibt."
            }

            (Message::PaymentFailed, Locale::En) => {
                "It looks like something went wrong with your payment."
            }
            (Message::PaymentFailed, Locale::Nl) => {
                "Er lijkt iets mis te zijn gegaan met je betaling."
            }
            (Message::PaymentFailed, Locale::De) => {
                "Bei Ihrer Zahlung ist offenbar etwas schiefgelaufen."
            }

            (Message::QuotaExceeded, Locale::En) => {
                "Your payment was received, but the tickets in your order are no longer available. Please contact the event organizer."
            }
            (Message::QuotaExceeded, Locale::Nl) => {
                "Je betaling is ontvangen, maar de tickets in je bestelling zijn niet meer beschikbaar. Neem contact op met de organisator."
            }
            (Message::QuotaExceeded, Locale::De) => {
                "Ihre Zahlung ist eingegangen, aber die Tickets Ihrer Bestellung sind nicht mehr verfügbar. Bitte kontaktieren Sie den Veranstalter."
            }

            (Message::ChooseIssuer, Locale::En) => "Please select your bank.",
            (Message::ChooseIssuer, Locale::Nl) => "Kies je bank.",
            (Message::ChooseIssuer, Locale::De) => "Bitte wählen Sie Ihre Bank.",

            (Message::YourBank, Locale::En) => "Your bank",
            (Message::YourBank, Locale::Nl) => "Je bank",
            (Message::YourBank, Locale::De) => "Ihre Bank",

            (Message::OrderNotFound, Locale::En) => "We could not find your order.",
            (Message::OrderNotFound, Locale::Nl) => "We konden je bestelling niet vinden.",
            (Message::OrderNotFound, Locale::De) => "Wir konnten Ihre Bestellung nicht finden.",

            (Message::OrderNotPayable, Locale::En) => "This order cannot be paid anymore.",
            (Message::OrderNotPayable, Locale::Nl) => {
                "Deze bestelling kan niet meer betaald worden."
            }
            (Message::OrderNotPayable, Locale::De) => {
                "Diese Bestellung kann nicht mehr bezahlt werden."
            }

            (Message::TryAgainLater, Locale::En) => "Please try again later.",
            (Message::TryAgainLater, Locale::Nl) => "Probeer het later opnieuw.",
            (Message::TryAgainLater, Locale::De) => "Bitte versuchen Sie es später erneut.",

            (Message::MerchantIdLabel, Locale::En) => "Merchant ID",
            (Message::MerchantIdLabel, Locale::Nl) => "Merchant-ID",
            (Message::MerchantIdLabel, Locale::De) => "Händler-ID",

            (Message::SecretCodeLabel, Locale::En) => "Secret code",
            (Message::SecretCodeLabel, Locale::Nl) => "Geheime code",
            (Message::SecretCodeLabel, Locale::De) => "Geheimcode",

            (Message::IdealBankLabel, Locale::En) => "iDEAL bank",
            (Message::IdealBankLabel, Locale::Nl) => "iDEAL-bank",
            (Message::IdealBankLabel, Locale::De) => "iDEAL-Bank",

            (Message::VerboseName, Locale::En) => "iDEAL via ICEPAY",
            (Message::VerboseName, Locale::Nl) => "iDEAL via ICEPAY",
            (Message::VerboseName, Locale::De) => "iDEAL über ICEPAY",

            (Message::ReportedEvent, Locale::En) => "ICEPAY reported an event: {}",
            (Message::ReportedEvent, Locale::Nl) => "ICEPAY meldde een gebeurtenis: {}",
            (Message::ReportedEvent, Locale::De) => "ICEPAY meldete ein Ereignis: {}",

            (Message::EventPaid, Locale::En) => "Payment succeeded.",
            (Message::EventPaid, Locale::Nl) => "Betaling geslaagd.",
            (Message::EventPaid, Locale::De) => "Zahlung erfolgreich.",

            (Message::EventPending, Locale::En) => "Payment pending.",
            (Message::EventPending, Locale::Nl) => "Betaling in behandeling.",
            (Message::EventPending, Locale::De) => "Zahlung ausstehend.",

            (Message::EventFailed, Locale::En) => "Payment failed. Reason: {}",
            (Message::EventFailed, Locale::Nl) => "Betaling mislukt. Reden: {}",
            (Message::EventFailed, Locale::De) => "Zahlung fehlgeschlagen. Grund: {}",

            (Message::EventRefunded, Locale::En) => "Payment refunded.",
            (Message::EventRefunded, Locale::Nl) => "Betaling terugbetaald.",
            (Message::EventRefunded, Locale::De) => "Zahlung erstattet.",

            (Message::EventChargeback, Locale::En) => "Chargeback received. Reason: {}",
            (Message::EventChargeback, Locale::Nl) => "Terugboeking ontvangen. Reden: {}",
            (Message::EventChargeback, Locale::De) => "Rückbuchung erhalten. Grund: {}",
        }
    }
}
