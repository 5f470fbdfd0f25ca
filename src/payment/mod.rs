//! VNPay integration: signed redirect URLs out, signed return parameters in.

pub mod signature;

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::config::PaymentConfig;
use crate::domain::{Money, PaymentStatus};
use crate::{CommerceError, Result};

pub const TXN_REF: &str = "vnp_TxnRef";
pub const RESPONSE_CODE: &str = "vnp_ResponseCode";
/// Response code the gateway uses for a successful payment.
pub const SUCCESS_CODE: &str = "00";

/// Everything needed to send a buyer to the gateway for one order.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub order_id: String,
    pub amount: Money,
    pub ip_addr: String,
    pub locale: Option<String>,
    pub bank_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Builds the gateway URL with a signed, canonical query string.
pub fn build_payment_url(config: &PaymentConfig, request: &PaymentRequest) -> String {
    // The gateway expects local time in Vietnam (UTC+7).
    let create_date = (request.created_at + Duration::hours(7)).format("%Y%m%d%H%M%S").to_string();

    let mut params: HashMap<String, String> = [
        ("vnp_Version", config.version.clone()),
        ("vnp_Command", config.command.clone()),
        ("vnp_TmnCode", config.tmn_code.clone()),
        ("vnp_Locale", request.locale.clone().unwrap_or_else(|| config.default_locale.clone())),
        ("vnp_CurrCode", config.currency.clone()),
        (TXN_REF, request.order_id.clone()),
        ("vnp_OrderInfo", format!("Thanh toán đơn hàng {}", request.order_id)),
        ("vnp_OrderType", "billpayment".to_string()),
        ("vnp_Amount", request.amount.minor_units().to_string()),
        ("vnp_ReturnUrl", config.return_url.clone()),
        ("vnp_IpAddr", request.ip_addr.clone()),
        ("vnp_CreateDate", create_date),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    if let Some(bank_code) = request.bank_code.as_ref().filter(|c| !c.is_empty()) {
        params.insert("vnp_BankCode".to_string(), bank_code.clone());
    }

    let query = signature::sign_data(&signature::canonicalize(&params));
    let hash = signature::sign(&config.hash_secret, &query);
    format!("{}?{}&{}={}", config.endpoint, query, signature::SECURE_HASH, hash)
}

/// Authenticated result of a gateway callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayReturn {
    pub txn_ref: String,
    pub response_code: String,
}

impl GatewayReturn {
    /// Verifies the signature over `params` before reading anything out of them.
    pub fn verify(config: &PaymentConfig, params: &HashMap<String, String>) -> Result<Self> {
        if !signature::verify(&config.hash_secret, params) {
            return Err(CommerceError::SignatureMismatch);
        }
        let field = |key: &str| {
            params.get(key).cloned().ok_or_else(|| CommerceError::InvalidInput(format!("missing {key}")))
        };
        Ok(Self { txn_ref: field(TXN_REF)?, response_code: field(RESPONSE_CODE)? })
    }

    pub fn payment_status(&self) -> PaymentStatus {
        if self.response_code == SUCCESS_CODE { PaymentStatus::Completed } else { PaymentStatus::Failed }
    }
}
