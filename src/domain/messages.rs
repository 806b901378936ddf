//! Request and response aggregates for the six payment operations.
//!
//! The core passes these through unmodified; only channel modules interpret
//! them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Fields shared by every request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BaseRequest {
    pub merchant_id: String,
    pub channel_id: String,
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra_params: HashMap<String, String>,
}

impl BaseRequest {
    /// Builds a request header stamped with the current time.
    pub fn new(
        merchant_id: impl Into<String>,
        channel_id: impl Into<String>,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            channel_id: channel_id.into(),
            request_id: request_id.into(),
            timestamp: Utc::now(),
            extra_params: HashMap::new(),
        }
    }
}

/// Fields shared by every response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BaseResponse {
    pub success: bool,
    pub code: String,
    pub message: String,
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra_data: HashMap<String, String>,
}

impl BaseResponse {
    pub const SUCCESS: &'static str = "SUCCESS";

    /// A successful response echoing `request_id`.
    pub fn ok(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Self::SUCCESS.to_owned(),
            message: message.into(),
            request_id: request_id.into(),
            timestamp: Utc::now(),
            extra_data: HashMap::new(),
        }
    }

    /// A business-level failure; the operation itself completed.
    pub fn failure(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            code: code.into(),
            message: message.into(),
            request_id: request_id.into(),
            timestamp: Utc::now(),
            extra_data: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phone: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id_number: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecipientInfo {
    pub name: String,
    pub bank_account: String,
    pub bank_code: String,
    pub bank_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phone: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id_number: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CollectOrderRequest {
    #[serde(flatten)]
    pub base: BaseRequest,
    pub order_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub return_url: String,
    pub notify_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_info: Option<CustomerInfo>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CollectOrderResponse {
    #[serde(flatten)]
    pub base: BaseResponse,
    pub order_id: String,
    pub channel_order_id: String,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PayoutOrderRequest {
    #[serde(flatten)]
    pub base: BaseRequest,
    pub order_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub notify_url: String,
    pub recipient_info: Option<RecipientInfo>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PayoutOrderResponse {
    #[serde(flatten)]
    pub base: BaseResponse,
    pub order_id: String,
    pub channel_order_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CollectQueryRequest {
    #[serde(flatten)]
    pub base: BaseRequest,
    pub order_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_order_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CollectQueryResponse {
    #[serde(flatten)]
    pub base: BaseResponse,
    pub order_id: String,
    pub channel_order_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PayoutQueryRequest {
    #[serde(flatten)]
    pub base: BaseRequest,
    pub order_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_order_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PayoutQueryResponse {
    #[serde(flatten)]
    pub base: BaseResponse,
    pub order_id: String,
    pub channel_order_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BalanceInquiryRequest {
    #[serde(flatten)]
    pub base: BaseRequest,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub account_type: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BalanceInquiryResponse {
    #[serde(flatten)]
    pub base: BaseResponse,
    pub balance: Decimal,
    pub currency: String,
    pub account_type: String,
    pub last_updated: DateTime<Utc>,
}

/// An inbound notification pushed by the upstream provider.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CallbackRequest {
    #[serde(flatten)]
    pub base: BaseRequest,
    pub callback_type: String,
    pub callback_data: HashMap<String, Value>,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CallbackResponse {
    #[serde(flatten)]
    pub base: BaseResponse,
    pub processed: bool,
}
