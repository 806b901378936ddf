use crate::domain::channel::{ChannelResult, PaymentChannel, PaymentPlugin};
use crate::domain::context::CallContext;
use crate::domain::messages::{
    BalanceInquiryRequest, BalanceInquiryResponse, BaseResponse, CallbackRequest,
    CallbackResponse, CollectOrderRequest, CollectOrderResponse, CollectQueryRequest,
    CollectQueryResponse, CustomerInfo, PayoutOrderRequest, PayoutOrderResponse,
    PayoutQueryRequest, PayoutQueryResponse, RecipientInfo,
};
use crate::domain::metadata::{ModuleMetadata, Operation, PluginConfig};
use crate::error::ChannelError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde_json::{Map, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

const DEFAULT_SUCCESS_RATE: f64 = 0.95;
const MAX_DELAY_MS: u64 = 10_000;
const COLLECT_SETTLE_AFTER: Duration = Duration::from_secs(5);
const PAYOUT_SETTLE_AFTER: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq)]
struct MockSettings {
    delay: Duration,
    success_rate: f64,
}

impl Default for MockSettings {
    fn default() -> Self {
        Self {
            delay: Duration::ZERO,
            success_rate: DEFAULT_SUCCESS_RATE,
        }
    }
}

impl MockSettings {
    fn parse(config: &PluginConfig) -> ChannelResult<Self> {
        let mut settings = Self::default();

        if let Some(delay) = config.get("mock_delay_ms") {
            let delay = delay.as_u64().filter(|d| *d <= MAX_DELAY_MS).ok_or_else(|| {
                ChannelError::InvalidConfig(format!(
                    "mock_delay_ms must be an integer between 0 and {MAX_DELAY_MS}"
                ))
            })?;
            settings.delay = Duration::from_millis(delay);
        }

        if let Some(rate) = config.get("success_rate") {
            let rate = rate
                .as_f64()
                .filter(|r| (0.0..=1.0).contains(r))
                .ok_or_else(|| {
                    ChannelError::InvalidConfig(
                        "success_rate must be between 0.0 and 1.0".to_string(),
                    )
                })?;
            settings.success_rate = rate;
        }

        Ok(settings)
    }
}

#[derive(Debug, Clone)]
struct MockOrder {
    order_id: String,
    channel_order_id: String,
    amount: Decimal,
    currency: String,
    status: String,
    created_at: DateTime<Utc>,
    settled_at: Option<DateTime<Utc>>,
    #[allow(dead_code)]
    customer_info: Option<CustomerInfo>,
    #[allow(dead_code)]
    recipient_info: Option<RecipientInfo>,
}

impl MockOrder {
    /// Moves `from` to `completed` once the order is older than `after`.
    fn settle(&mut self, from: &str, after: Duration) {
        let age = Utc::now() - self.created_at;
        if self.status == from && age.to_std().is_ok_and(|age| age > after) {
            self.status = "completed".to_string();
            self.settled_at = Some(Utc::now());
        }
    }
}

/// An in-memory channel with configurable latency and success rate.
///
/// Used for demos, benchmarks and as the reference module shipped as a
/// `cdylib` under `plugins/mock-channel`.
#[derive(Debug, Default)]
pub struct MockChannel {
    settings: RwLock<MockSettings>,
    orders: Mutex<HashMap<String, MockOrder>>,
    sequence: AtomicU64,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn settings(&self) -> MockSettings {
        *self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    async fn simulate_delay(&self, ctx: &CallContext) -> ChannelResult<()> {
        let delay = self.settings().delay;
        if delay.is_zero() {
            return if ctx.is_cancelled() {
                Err(ChannelError::Cancelled)
            } else {
                Ok(())
            };
        }
        // Built as a cdylib this code has no runtime of its own; the host's
        // timer comes in through the context.
        ctx.sleep(delay).await
    }

    fn should_succeed(&self) -> bool {
        rand::thread_rng().gen_bool(self.settings().success_rate)
    }

    fn next_channel_order_id(&self, prefix: &str) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        format!("{prefix}_{nanos}_{seq}")
    }

    fn store(&self, order: MockOrder) {
        self.orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(order.order_id.clone(), order);
    }

    fn settle_and_get(&self, order_id: &str, from: &str, after: Duration) -> Option<MockOrder> {
        let mut orders = self.orders.lock().unwrap_or_else(PoisonError::into_inner);
        let order = orders.get_mut(order_id)?;
        order.settle(from, after);
        Some(order.clone())
    }
}

#[async_trait]
impl PaymentChannel for MockChannel {
    async fn collect_order(
        &self,
        ctx: &CallContext,
        req: &CollectOrderRequest,
    ) -> ChannelResult<CollectOrderResponse> {
        self.simulate_delay(ctx).await?;

        let channel_order_id = self.next_channel_order_id("MOCK");
        self.store(MockOrder {
            order_id: req.order_id.clone(),
            channel_order_id: channel_order_id.clone(),
            amount: req.amount,
            currency: req.currency.clone(),
            status: "pending".to_string(),
            created_at: Utc::now(),
            settled_at: None,
            customer_info: req.customer_info.clone(),
            recipient_info: None,
        });

        let response = if self.should_succeed() {
            CollectOrderResponse {
                base: BaseResponse::ok(
                    &req.base.request_id,
                    "Mock collection order created successfully",
                ),
                payment_url: Some(format!("https://mock-payment.com/pay/{channel_order_id}")),
                qr_code: Some(format!("data:image/png;base64,MOCK_QR_{channel_order_id}")),
                status: "pending".to_string(),
                ..Default::default()
            }
        } else {
            CollectOrderResponse {
                base: BaseResponse::failure(
                    &req.base.request_id,
                    "MOCK_ERROR",
                    "Mock collection order failed",
                ),
                status: "failed".to_string(),
                ..Default::default()
            }
        };

        Ok(CollectOrderResponse {
            order_id: req.order_id.clone(),
            channel_order_id,
            amount: req.amount,
            currency: req.currency.clone(),
            ..response
        })
    }

    async fn payout_order(
        &self,
        ctx: &CallContext,
        req: &PayoutOrderRequest,
    ) -> ChannelResult<PayoutOrderResponse> {
        self.simulate_delay(ctx).await?;

        let channel_order_id = self.next_channel_order_id("MOCK_PAYOUT");
        self.store(MockOrder {
            order_id: req.order_id.clone(),
            channel_order_id: channel_order_id.clone(),
            amount: req.amount,
            currency: req.currency.clone(),
            status: "processing".to_string(),
            created_at: Utc::now(),
            settled_at: None,
            customer_info: None,
            recipient_info: req.recipient_info.clone(),
        });

        let (base, status) = if self.should_succeed() {
            (
                BaseResponse::ok(&req.base.request_id, "Mock payout order created successfully"),
                "processing",
            )
        } else {
            (
                BaseResponse::failure(
                    &req.base.request_id,
                    "MOCK_ERROR",
                    "Mock payout order failed",
                ),
                "failed",
            )
        };

        Ok(PayoutOrderResponse {
            base,
            order_id: req.order_id.clone(),
            channel_order_id,
            amount: req.amount,
            currency: req.currency.clone(),
            status: status.to_string(),
        })
    }

    async fn collect_query(
        &self,
        ctx: &CallContext,
        req: &CollectQueryRequest,
    ) -> ChannelResult<CollectQueryResponse> {
        self.simulate_delay(ctx).await?;

        let Some(order) = self.settle_and_get(&req.order_id, "pending", COLLECT_SETTLE_AFTER)
        else {
            return Ok(CollectQueryResponse {
                base: BaseResponse::failure(
                    &req.base.request_id,
                    "ORDER_NOT_FOUND",
                    "Mock order not found",
                ),
                order_id: req.order_id.clone(),
                ..Default::default()
            });
        };

        Ok(CollectQueryResponse {
            base: BaseResponse::ok(
                &req.base.request_id,
                "Mock collection order queried successfully",
            ),
            order_id: order.order_id,
            channel_order_id: order.channel_order_id,
            amount: order.amount,
            currency: order.currency,
            status: order.status,
            paid_at: order.settled_at,
        })
    }

    async fn payout_query(
        &self,
        ctx: &CallContext,
        req: &PayoutQueryRequest,
    ) -> ChannelResult<PayoutQueryResponse> {
        self.simulate_delay(ctx).await?;

        let Some(order) = self.settle_and_get(&req.order_id, "processing", PAYOUT_SETTLE_AFTER)
        else {
            return Ok(PayoutQueryResponse {
                base: BaseResponse::failure(
                    &req.base.request_id,
                    "ORDER_NOT_FOUND",
                    "Mock order not found",
                ),
                order_id: req.order_id.clone(),
                ..Default::default()
            });
        };

        Ok(PayoutQueryResponse {
            base: BaseResponse::ok(&req.base.request_id, "Mock payout order queried successfully"),
            order_id: order.order_id,
            channel_order_id: order.channel_order_id,
            amount: order.amount,
            currency: order.currency,
            status: order.status,
            completed_at: order.settled_at,
        })
    }

    async fn balance_inquiry(
        &self,
        ctx: &CallContext,
        req: &BalanceInquiryRequest,
    ) -> ChannelResult<BalanceInquiryResponse> {
        self.simulate_delay(ctx).await?;

        // Between 1M and 1.5M, in cents.
        let cents: i64 = rand::thread_rng().gen_range(100_000_000..150_000_000);

        Ok(BalanceInquiryResponse {
            base: BaseResponse::ok(&req.base.request_id, "Mock balance inquiry successful"),
            balance: Decimal::new(cents, 2),
            currency: "CNY".to_string(),
            account_type: req.account_type.clone(),
            last_updated: Utc::now(),
        })
    }

    async fn callback(
        &self,
        ctx: &CallContext,
        req: &CallbackRequest,
    ) -> ChannelResult<CallbackResponse> {
        self.simulate_delay(ctx).await?;

        let processed = self.should_succeed();
        let message = if processed {
            "Mock callback processed successfully"
        } else {
            "Mock callback processing failed"
        };
        let mut base = BaseResponse::ok(&req.base.request_id, message);
        base.success = processed;

        Ok(CallbackResponse { base, processed })
    }
}

impl PaymentPlugin for MockChannel {
    fn metadata(&self) -> ChannelResult<ModuleMetadata> {
        let mut config_schema = Map::new();
        config_schema.insert(
            "mock_delay_ms".to_string(),
            json!({
                "type": "integer",
                "default": 100,
                "description": "Artificial delay in milliseconds for testing",
            }),
        );
        config_schema.insert(
            "success_rate".to_string(),
            json!({
                "type": "float",
                "default": DEFAULT_SUCCESS_RATE,
                "description": "Success rate for mock operations (0.0-1.0)",
            }),
        );

        Ok(ModuleMetadata {
            name: "Mock Payment Channel".to_string(),
            version: "1.0.0".to_string(),
            description: "A mock payment channel for testing and development".to_string(),
            author: "Payment Gateway Team".to_string(),
            channel_type: "mock".to_string(),
            capabilities: Operation::ALL
                .iter()
                .map(|op| op.as_str().to_string())
                .collect(),
            config_schema,
        })
    }

    fn initialize(&self, config: &PluginConfig) -> ChannelResult<()> {
        let settings = MockSettings::parse(config)?;
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
        Ok(())
    }

    fn validate_config(&self, config: &PluginConfig) -> ChannelResult<()> {
        MockSettings::parse(config).map(|_| ())
    }
}
