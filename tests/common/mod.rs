#![allow(dead_code)]

use async_trait::async_trait;
use paychan::application::registry::PluginRegistry;
use paychan::domain::channel::{ChannelResult, PaymentChannel, PaymentPlugin, PluginBox};
use paychan::domain::context::CallContext;
use paychan::domain::messages::{
    BalanceInquiryRequest, BalanceInquiryResponse, BaseResponse, CallbackRequest,
    CallbackResponse, CollectOrderRequest, CollectOrderResponse, CollectQueryRequest,
    CollectQueryResponse, PayoutOrderRequest, PayoutOrderResponse, PayoutQueryRequest,
    PayoutQueryResponse,
};
use paychan::domain::metadata::{ModuleMetadata, Operation, PluginConfig};
use paychan::error::ChannelError;
use paychan::infrastructure::in_memory::InMemoryModuleLoader;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

pub fn metadata(name: &str) -> ModuleMetadata {
    ModuleMetadata {
        name: name.to_string(),
        version: "1.0.0".to_string(),
        description: format!("{name} stub channel"),
        author: "tests".to_string(),
        channel_type: "stub".to_string(),
        capabilities: Operation::ALL
            .iter()
            .map(|op| op.as_str().to_string())
            .collect::<BTreeSet<_>>(),
        ..Default::default()
    }
}

/// A channel whose behaviour is fixed by the test that builds it.
#[derive(Clone)]
pub struct StubPlugin {
    pub metadata: ModuleMetadata,
    /// While set, `metadata()` fails.
    pub broken: Arc<AtomicBool>,
    /// While set, `metadata()` panics.
    pub panicking: Arc<AtomicBool>,
    /// Milliseconds `metadata()` blocks its thread for; zero disables.
    pub stall_ms: Arc<AtomicU64>,
    pub delay: Duration,
}

impl StubPlugin {
    pub fn new(name: &str) -> Self {
        Self {
            metadata: metadata(name),
            broken: Arc::new(AtomicBool::new(false)),
            panicking: Arc::new(AtomicBool::new(false)),
            stall_ms: Arc::new(AtomicU64::new(0)),
            delay: Duration::ZERO,
        }
    }

    pub fn with_metadata(metadata: ModuleMetadata) -> Self {
        Self {
            metadata,
            ..Self::new("stub")
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn boxed(&self) -> PluginBox {
        Box::new(self.clone())
    }

    async fn wait(&self, ctx: &CallContext) -> ChannelResult<()> {
        if self.delay.is_zero() {
            return Ok(());
        }
        ctx.sleep(self.delay).await
    }
}

#[async_trait]
impl PaymentChannel for StubPlugin {
    async fn collect_order(
        &self,
        ctx: &CallContext,
        req: &CollectOrderRequest,
    ) -> ChannelResult<CollectOrderResponse> {
        self.wait(ctx).await?;
        Ok(CollectOrderResponse {
            base: BaseResponse::ok(&req.base.request_id, "collected"),
            order_id: req.order_id.clone(),
            channel_order_id: format!("{}_{}", self.metadata.name, req.order_id),
            amount: req.amount,
            currency: req.currency.clone(),
            status: "pending".to_string(),
            ..Default::default()
        })
    }

    async fn payout_order(
        &self,
        ctx: &CallContext,
        req: &PayoutOrderRequest,
    ) -> ChannelResult<PayoutOrderResponse> {
        self.wait(ctx).await?;
        Ok(PayoutOrderResponse {
            base: BaseResponse::ok(&req.base.request_id, "paid out"),
            order_id: req.order_id.clone(),
            amount: req.amount,
            currency: req.currency.clone(),
            status: "processing".to_string(),
            ..Default::default()
        })
    }

    async fn collect_query(
        &self,
        ctx: &CallContext,
        req: &CollectQueryRequest,
    ) -> ChannelResult<CollectQueryResponse> {
        self.wait(ctx).await?;
        Ok(CollectQueryResponse {
            base: BaseResponse::failure(&req.base.request_id, "ORDER_NOT_FOUND", "unknown order"),
            order_id: req.order_id.clone(),
            ..Default::default()
        })
    }

    async fn payout_query(
        &self,
        ctx: &CallContext,
        req: &PayoutQueryRequest,
    ) -> ChannelResult<PayoutQueryResponse> {
        self.wait(ctx).await?;
        Ok(PayoutQueryResponse {
            base: BaseResponse::failure(&req.base.request_id, "ORDER_NOT_FOUND", "unknown order"),
            order_id: req.order_id.clone(),
            ..Default::default()
        })
    }

    async fn balance_inquiry(
        &self,
        ctx: &CallContext,
        req: &BalanceInquiryRequest,
    ) -> ChannelResult<BalanceInquiryResponse> {
        self.wait(ctx).await?;
        Ok(BalanceInquiryResponse {
            base: BaseResponse::ok(&req.base.request_id, "balance"),
            currency: "CNY".to_string(),
            ..Default::default()
        })
    }

    async fn callback(
        &self,
        _ctx: &CallContext,
        _req: &CallbackRequest,
    ) -> ChannelResult<CallbackResponse> {
        Err(ChannelError::Upstream("signature mismatch".to_string()))
    }
}

impl PaymentPlugin for StubPlugin {
    fn metadata(&self) -> ChannelResult<ModuleMetadata> {
        let stall = self.stall_ms.load(Ordering::SeqCst);
        if stall > 0 {
            std::thread::sleep(Duration::from_millis(stall));
        }
        if self.panicking.load(Ordering::SeqCst) {
            panic!("stub metadata panicked");
        }
        if self.broken.load(Ordering::SeqCst) {
            return Err(ChannelError::Upstream("metadata unavailable".to_string()));
        }
        Ok(self.metadata.clone())
    }

    fn initialize(&self, _config: &PluginConfig) -> ChannelResult<()> {
        Ok(())
    }

    fn validate_config(&self, _config: &PluginConfig) -> ChannelResult<()> {
        Ok(())
    }
}

/// Registers `stub` in `loader` under `path`; every load yields a fresh clone
/// sharing the stub's switches.
pub fn register_stub(loader: &InMemoryModuleLoader, path: &str, stub: &StubPlugin) {
    let stub = stub.clone();
    loader.register(path, move || Some(stub.boxed()));
}

/// A registry plus a handle on its loader's factory table.
pub fn registry() -> (Arc<PluginRegistry>, InMemoryModuleLoader) {
    let loader = InMemoryModuleLoader::new();
    let registry = PluginRegistry::new(Box::new(loader.clone()));
    (Arc::new(registry), loader)
}
