use std::fmt::Display;

use axum::http::{Method, header::InvalidHeaderValue};

use crate::{
    config::Config,
    gateway::{
        PreparedRequest,
        auth::{self, AccessToken},
        correlation,
    },
};

pub const MERCHANT_PAY_PATH: &str = "/mvola/mm/transactions/type/merchantpay/1.0.0";
const CURRENCY: &str = "Ar";
const DEFAULT_DESCRIPTION: &str = "Paiement Demo MVola";
const FOREIGN_CURRENCY: &str = "USD";
const FOREIGN_AMOUNT: &str = "1";

#[derive(Debug, PartialEq, Eq)]
pub enum ValidationError {
    Missing(&'static str),
    Invalid { field: &'static str, reason: &'static str },
}

impl std::error::Error for ValidationError {}

impl Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(field) => write!(f, "{field} is required"),
            Self::Invalid { field, reason } => write!(f, "{field} {reason}"),
        }
    }
}

/// Validated merchant pay request.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub amount: String,
    pub payer_msisdn: String,
    pub description: Option<String>,
    pub reference: Option<String>,
    /// Caller supplied correlation id, generated per call when absent
    pub correlation_id: Option<String>,
}

impl PaymentRequest {
    pub fn new(
        amount: Option<String>,
        payer_msisdn: Option<String>,
    ) -> Result<Self, ValidationError> {
        let amount = non_blank(amount).ok_or(ValidationError::Missing("amount"))?;
        let payer_msisdn =
            non_blank(payer_msisdn).ok_or(ValidationError::Missing("customerMsisdn"))?;
        Ok(Self {
            amount,
            payer_msisdn,
            description: None,
            reference: None,
            correlation_id: None,
        })
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = non_blank(description);
        self
    }

    pub fn with_reference(mut self, reference: Option<String>) -> Self {
        self.reference = non_blank(reference);
        self
    }

    pub fn with_correlation_id(
        mut self,
        correlation_id: Option<String>,
    ) -> Result<Self, ValidationError> {
        self.correlation_id = match non_blank(correlation_id) {
            Some(id) if !is_identifier(&id) => {
                return Err(ValidationError::Invalid {
                    field: "correlationId",
                    reason: "must only contain letters, digits, '-', '_' or '.'",
                });
            }
            id => id,
        };
        Ok(self)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Provider identifiers end up in URL paths and headers.
pub fn is_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[derive(Debug, PartialEq, Eq, serde::Serialize)]
pub struct KeyValue<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

impl<'a> KeyValue<'a> {
    fn msisdn(value: &'a str) -> Self {
        Self {
            key: "msisdn",
            value,
        }
    }
}

/// Merchant pay body. Every key is always present, empty strings included.
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantPayRequest<'a> {
    pub amount: &'a str,
    pub currency: &'a str,
    pub description_text: &'a str,
    pub requesting_organisation_transaction_reference: &'a str,
    pub request_date: &'a str,
    pub original_transaction_reference: &'a str,
    pub debit_party: [KeyValue<'a>; 1],
    pub credit_party: [KeyValue<'a>; 1],
    pub metadata: [KeyValue<'a>; 3],
}

impl<'a> MerchantPayRequest<'a> {
    pub fn new(config: &'a Config, payment: &'a PaymentRequest) -> Self {
        Self {
            amount: &payment.amount,
            currency: CURRENCY,
            description_text: payment.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION),
            requesting_organisation_transaction_reference: payment
                .reference
                .as_deref()
                .unwrap_or_default(),
            request_date: "",
            original_transaction_reference: "",
            debit_party: [KeyValue::msisdn(&payment.payer_msisdn)],
            credit_party: [KeyValue::msisdn(&config.partner_msisdn)],
            metadata: [
                KeyValue {
                    key: "partnerName",
                    value: &config.partner_name,
                },
                KeyValue {
                    key: "fc",
                    value: FOREIGN_CURRENCY,
                },
                KeyValue {
                    key: "amountFc",
                    value: FOREIGN_AMOUNT,
                },
            ],
        }
    }
}

/// Shapes provider requests. Owns no transport.
#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder<'a> {
    pub(super) config: &'a Config,
    pub(super) token: &'a AccessToken,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(config: &'a Config, token: &'a AccessToken) -> Self {
        Self { config, token }
    }

    pub fn initiate(
        &self,
        payment: &'a PaymentRequest,
    ) -> Result<PreparedRequest<'a>, InvalidHeaderValue> {
        let correlation_id = payment
            .correlation_id
            .clone()
            .unwrap_or_else(correlation::next_correlation_id);
        let mut headers = auth::provider_headers(self.config, self.token, &correlation_id)?;
        if let Some(callback_url) = &self.config.callback_url {
            headers = auth::with_callback(headers, callback_url)?;
        }
        Ok(PreparedRequest {
            method: Method::POST,
            url: format!("{}{}/", self.config.api_url, MERCHANT_PAY_PATH),
            headers,
            correlation_id,
            body: Some(MerchantPayRequest::new(self.config, payment)),
        })
    }
}
