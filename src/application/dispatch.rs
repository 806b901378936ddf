use super::registry::PluginRegistry;
use crate::domain::context::CallContext;
use crate::domain::messages::{
    BalanceInquiryRequest, BalanceInquiryResponse, CallbackRequest, CallbackResponse,
    CollectOrderRequest, CollectOrderResponse, CollectQueryRequest, CollectQueryResponse,
    PayoutOrderRequest, PayoutOrderResponse, PayoutQueryRequest, PayoutQueryResponse,
};
use crate::domain::metadata::Operation;
use crate::error::DispatchError;
use std::sync::Arc;
use tracing::debug;

type DispatchResult<T> = std::result::Result<T, DispatchError>;

/// Routes payment operations to the module registered for a channel.
///
/// Each call looks the channel up (which counts as usage), releases the
/// registry, then awaits the module. Responses and module errors come back
/// exactly as the module produced them: no retries, no translation.
#[derive(Clone)]
pub struct PaymentDispatcher {
    registry: Arc<PluginRegistry>,
}

impl PaymentDispatcher {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub async fn collect_order(
        &self,
        channel_id: &str,
        ctx: &CallContext,
        req: &CollectOrderRequest,
    ) -> DispatchResult<CollectOrderResponse> {
        let channel = self.registry.get_plugin(channel_id).await?;
        trace_dispatch(channel_id, Operation::CollectOrder, &req.base.request_id);
        Ok(channel.collect_order(ctx, req).await?)
    }

    pub async fn payout_order(
        &self,
        channel_id: &str,
        ctx: &CallContext,
        req: &PayoutOrderRequest,
    ) -> DispatchResult<PayoutOrderResponse> {
        let channel = self.registry.get_plugin(channel_id).await?;
        trace_dispatch(channel_id, Operation::PayoutOrder, &req.base.request_id);
        Ok(channel.payout_order(ctx, req).await?)
    }

    pub async fn collect_query(
        &self,
        channel_id: &str,
        ctx: &CallContext,
        req: &CollectQueryRequest,
    ) -> DispatchResult<CollectQueryResponse> {
        let channel = self.registry.get_plugin(channel_id).await?;
        trace_dispatch(channel_id, Operation::CollectQuery, &req.base.request_id);
        Ok(channel.collect_query(ctx, req).await?)
    }

    pub async fn payout_query(
        &self,
        channel_id: &str,
        ctx: &CallContext,
        req: &PayoutQueryRequest,
    ) -> DispatchResult<PayoutQueryResponse> {
        let channel = self.registry.get_plugin(channel_id).await?;
        trace_dispatch(channel_id, Operation::PayoutQuery, &req.base.request_id);
        Ok(channel.payout_query(ctx, req).await?)
    }

    pub async fn balance_inquiry(
        &self,
        channel_id: &str,
        ctx: &CallContext,
        req: &BalanceInquiryRequest,
    ) -> DispatchResult<BalanceInquiryResponse> {
        let channel = self.registry.get_plugin(channel_id).await?;
        trace_dispatch(channel_id, Operation::BalanceInquiry, &req.base.request_id);
        Ok(channel.balance_inquiry(ctx, req).await?)
    }

    pub async fn callback(
        &self,
        channel_id: &str,
        ctx: &CallContext,
        req: &CallbackRequest,
    ) -> DispatchResult<CallbackResponse> {
        let channel = self.registry.get_plugin(channel_id).await?;
        trace_dispatch(channel_id, Operation::Callback, &req.base.request_id);
        Ok(channel.callback(ctx, req).await?)
    }
}

fn trace_dispatch(channel_id: &str, operation: Operation, request_id: &str) {
    debug!(channel_id, %operation, request_id, "dispatching");
}
