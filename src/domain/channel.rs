use super::context::CallContext;
use super::messages::{
    BalanceInquiryRequest, BalanceInquiryResponse, CallbackRequest, CallbackResponse,
    CollectOrderRequest, CollectOrderResponse, CollectQueryRequest, CollectQueryResponse,
    PayoutOrderRequest, PayoutOrderResponse, PayoutQueryRequest, PayoutQueryResponse,
};
use super::metadata::{ModuleMetadata, PluginConfig};
use crate::error::ChannelError;
use async_trait::async_trait;
use std::sync::Arc;

pub type ChannelResult<T> = std::result::Result<T, ChannelError>;

/// The six payment operations every channel serves.
#[async_trait]
pub trait PaymentChannel: Send + Sync {
    /// Creates a collection order. Usually the busiest path.
    async fn collect_order(
        &self,
        ctx: &CallContext,
        req: &CollectOrderRequest,
    ) -> ChannelResult<CollectOrderResponse>;

    async fn payout_order(
        &self,
        ctx: &CallContext,
        req: &PayoutOrderRequest,
    ) -> ChannelResult<PayoutOrderResponse>;

    async fn collect_query(
        &self,
        ctx: &CallContext,
        req: &CollectQueryRequest,
    ) -> ChannelResult<CollectQueryResponse>;

    async fn payout_query(
        &self,
        ctx: &CallContext,
        req: &PayoutQueryRequest,
    ) -> ChannelResult<PayoutQueryResponse>;

    async fn balance_inquiry(
        &self,
        ctx: &CallContext,
        req: &BalanceInquiryRequest,
    ) -> ChannelResult<BalanceInquiryResponse>;

    /// Processes an inbound notification from the upstream provider.
    async fn callback(
        &self,
        ctx: &CallContext,
        req: &CallbackRequest,
    ) -> ChannelResult<CallbackResponse>;
}

/// A loadable channel module: the payment operations plus management hooks.
///
/// Instances are shared across concurrent dispatches, so `initialize` takes
/// `&self` and implementations keep mutable state behind their own locks.
pub trait PaymentPlugin: PaymentChannel {
    fn metadata(&self) -> ChannelResult<ModuleMetadata>;

    fn initialize(&self, config: &PluginConfig) -> ChannelResult<()>;

    fn validate_config(&self, config: &PluginConfig) -> ChannelResult<()>;
}

pub type PluginBox = Box<dyn PaymentPlugin>;
pub type SharedPlugin = Arc<dyn PaymentPlugin>;
