//! Inbound ICEPAY messages
//!
//! A [`Postback`] starts out [`Unverified`]. Only [`Postback::verify`] turns it
//! into a [`Verified`] one, and only verified postbacks expose the accessors
//! the reconciliation code needs. An unverified postback therefore cannot
//! reach the order store.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::payments::providers::icepay::checksum::{digests_match, fields_for, message_checksum};
use crate::payments::types::{PostbackChannel, PostbackRequest};

/// Checksum not yet checked
#[derive(Debug)]
pub struct Unverified;

/// Checksum matched the merchant secret
#[derive(Debug)]
pub struct Verified;

#[derive(Debug)]
pub struct Postback<S> {
    channel: PostbackChannel,
    params: HashMap<String, String>,
    _state: PhantomData<S>,
}

impl<S> Postback<S> {
    pub fn channel(&self) -> PostbackChannel {
        self.channel
    }

    fn field(&self, name: &str) -> &str {
        self.params.get(name).map(String::as_str).unwrap_or_default()
    }
}

impl Postback<Unverified> {
    pub fn new(request: PostbackRequest) -> Self {
        Self {
            channel: request.channel,
            params: request.params,
            _state: PhantomData,
        }
    }

    /// Re-derive the checksum with `secret` and compare it to the one sent.
    ///
    /// A field absent from the message counts as empty. A missing or
    /// mismatching `Checksum` is a `BadChecksum` error.
    pub fn verify(self, secret: &str) -> AppResult<Postback<Verified>> {
        let provided = self.field("Checksum");
        if provided.trim().is_empty() {
            return Err(AppError::bad_checksum("no Checksum parameter"));
        }

        let values: Vec<&str> = fields_for(self.channel)
            .iter()
            .map(|name| self.field(name))
            .collect();
        let expected = message_checksum(secret, &values);

        if !digests_match(&expected, provided) {
            return Err(AppError::bad_checksum("checksum mismatch"));
        }

        Ok(Postback {
            channel: self.channel,
            params: self.params,
            _state: PhantomData,
        })
    }
}

impl Postback<Verified> {
    pub fn status(&self) -> IcepayStatus {
        IcepayStatus::from_code(self.field("Status"))
    }

    pub fn status_code(&self) -> &str {
        self.field("StatusCode")
    }

    pub fn merchant(&self) -> &str {
        self.field("Merchant")
    }

    /// Order code of the host order
    pub fn reference(&self) -> &str {
        self.field("Reference").trim()
    }

    /// Merchant order reference of the attempt (`<order id>-<attempt>`)
    pub fn order_id(&self) -> &str {
        self.field("OrderID")
    }

    pub fn payment_id(&self) -> &str {
        self.field("PaymentID")
    }

    pub fn transaction_id(&self) -> &str {
        self.field("TransactionID")
    }

    /// Message content for the order's audit log, checksum stripped.
    pub fn log_data(&self) -> Value {
        let mut data: Map<String, Value> = self
            .params
            .iter()
            .filter(|(key, _)| key.as_str() != "Checksum")
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect();
        data.insert(
            "channel".to_string(),
            serde_json::to_value(self.channel).unwrap_or(Value::Null),
        );
        Value::Object(data)
    }
}

/// Payment status as reported by ICEPAY
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IcepayStatus {
    Ok,
    Open,
    Err,
    Refund,
    Chargeback,
    Other(String),
}

impl IcepayStatus {
    /// Codes are matched exactly; anything else is `Other`.
    pub fn from_code(code: &str) -> Self {
        match code {
            "OK" => IcepayStatus::Ok,
            "OPEN" => IcepayStatus::Open,
            "ERR" => IcepayStatus::Err,
            "REFUND" => IcepayStatus::Refund,
            "CBACK" => IcepayStatus::Chargeback,
            other => IcepayStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            IcepayStatus::Ok => "OK",
            IcepayStatus::Open => "OPEN",
            IcepayStatus::Err => "ERR",
            IcepayStatus::Refund => "REFUND",
            IcepayStatus::Chargeback => "CBACK",
            IcepayStatus::Other(code) => code.as_str(),
        }
    }
}

impl fmt::Display for IcepayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
