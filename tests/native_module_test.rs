#![cfg(feature = "dynamic-loading")]

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use paychan::application::dispatch::PaymentDispatcher;
use paychan::application::registry::PluginRegistry;
use paychan::domain::channel::{PaymentChannel, PaymentPlugin};
use paychan::domain::context::CallContext;
use paychan::domain::messages::{
    BalanceInquiryRequest, BaseRequest, CallbackRequest, CollectOrderRequest,
    CollectQueryRequest, PayoutOrderRequest, PayoutQueryRequest,
};
use paychan::domain::ports::ModuleLoader;
use paychan::error::{ChannelError, DispatchError, LoadError, RegistryError};
use paychan::infrastructure::dylib::DylibLoader;
use predicates::prelude::*;
use rust_decimal_macros::dec;
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

/// Builds a workspace `cdylib` into its own target directory and copies the
/// artifact to a name unique to `features`, so no loaded image is overwritten.
fn build_module(package: &str, features: &[&str]) -> PathBuf {
    static CARGO: Mutex<()> = Mutex::new(());
    let _guard = CARGO.lock().unwrap_or_else(PoisonError::into_inner);

    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let target_dir = root.join("target").join("native-modules");

    let mut cmd = Command::new(env!("CARGO"));
    cmd.current_dir(root)
        .args(["build", "--quiet", "-p", package, "--target-dir"])
        .arg(&target_dir);
    if !features.is_empty() {
        cmd.arg("--features").arg(features.join(","));
    }
    let status = cmd.status().expect("failed to run cargo");
    assert!(status.success(), "building {package} failed");

    let stem = package.replace('-', "_");
    let built = target_dir
        .join("debug")
        .join(format!("{DLL_PREFIX}{stem}{DLL_SUFFIX}"));
    let tag = if features.is_empty() {
        "plain".to_string()
    } else {
        features.join("_")
    };
    let staged_dir = target_dir.join("staged");
    std::fs::create_dir_all(&staged_dir).unwrap();
    let staged = staged_dir.join(format!("{DLL_PREFIX}{stem}_{tag}{DLL_SUFFIX}"));
    std::fs::copy(&built, &staged).unwrap();
    staged
}

fn mock_module() -> &'static Path {
    static PATH: OnceLock<PathBuf> = OnceLock::new();
    PATH.get_or_init(|| build_module("mock-channel", &[]))
}

fn fixture_module(features: &'static [&'static str]) -> PathBuf {
    static PLAIN: OnceLock<PathBuf> = OnceLock::new();
    static STALE_ABI: OnceLock<PathBuf> = OnceLock::new();
    static STALE_CORE: OnceLock<PathBuf> = OnceLock::new();
    let cell = match features {
        [] => &PLAIN,
        ["stale-abi"] => &STALE_ABI,
        _ => &STALE_CORE,
    };
    cell.get_or_init(|| build_module("fixture-module", features))
        .clone()
}

fn native_registry() -> Arc<PluginRegistry> {
    Arc::new(PluginRegistry::new(Box::new(DylibLoader::new())))
}

async fn load_configured_mock(registry: &PluginRegistry, channel_id: &str, delay_ms: u64) {
    registry
        .load_plugin(mock_module(), channel_id)
        .await
        .unwrap();
    let config = serde_json::json!({ "mock_delay_ms": delay_ms, "success_rate": 1.0 });
    registry
        .configure_plugin(channel_id, config.as_object().unwrap())
        .await
        .unwrap();
}

fn base(channel_id: &str, request_id: &str) -> BaseRequest {
    BaseRequest::new("MERCHANT_001", channel_id, request_id)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_native_mock_serves_every_operation_with_delay() {
    let registry = native_registry();
    load_configured_mock(&registry, "native", 10).await;
    let dispatcher = PaymentDispatcher::new(registry.clone());

    let worker = tokio::spawn(async move {
        let ctx = CallContext::with_timeout(Duration::from_secs(10));

        let collect = CollectOrderRequest {
            base: base("native", "REQ_1"),
            order_id: "ORDER_001".to_string(),
            amount: dec!(100.50),
            currency: "CNY".to_string(),
            ..Default::default()
        };
        let created = dispatcher.collect_order("native", &ctx, &collect).await.unwrap();
        assert!(created.base.success);
        assert!(created.channel_order_id.starts_with("MOCK_"));

        let payout = PayoutOrderRequest {
            base: base("native", "REQ_2"),
            order_id: "PAYOUT_001".to_string(),
            amount: dec!(50),
            currency: "CNY".to_string(),
            ..Default::default()
        };
        let paid = dispatcher.payout_order("native", &ctx, &payout).await.unwrap();
        assert_eq!(paid.status, "processing");

        let query = CollectQueryRequest {
            base: base("native", "REQ_3"),
            order_id: "ORDER_001".to_string(),
            channel_order_id: None,
        };
        let queried = dispatcher.collect_query("native", &ctx, &query).await.unwrap();
        assert!(queried.base.success);
        assert_eq!(queried.channel_order_id, created.channel_order_id);

        let query = PayoutQueryRequest {
            base: base("native", "REQ_4"),
            order_id: "UNKNOWN".to_string(),
            channel_order_id: None,
        };
        let missing = dispatcher.payout_query("native", &ctx, &query).await.unwrap();
        assert_eq!(missing.base.code, "ORDER_NOT_FOUND");

        let balance = BalanceInquiryRequest {
            base: base("native", "REQ_5"),
            account_type: "settlement".to_string(),
        };
        let balance = dispatcher.balance_inquiry("native", &ctx, &balance).await.unwrap();
        assert_eq!(balance.currency, "CNY");

        let callback = CallbackRequest {
            base: base("native", "REQ_6"),
            callback_type: "payment_notification".to_string(),
            ..Default::default()
        };
        let handled = dispatcher.callback("native", &ctx, &callback).await.unwrap();
        assert!(handled.processed);
    });
    worker.await.unwrap();

    assert_eq!(registry.usage("native").await.unwrap().usage_count, 6);
    assert!(registry.health_check().await["native"]);
}

#[tokio::test]
async fn test_native_mock_delay_honors_deadline() {
    let registry = native_registry();
    load_configured_mock(&registry, "slow", 5_000).await;
    let dispatcher = PaymentDispatcher::new(registry);

    let ctx = CallContext::with_timeout(Duration::from_millis(20));
    let err = dispatcher
        .balance_inquiry("slow", &ctx, &BalanceInquiryRequest::default())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, DispatchError::Channel(ChannelError::Cancelled)));
}

#[tokio::test]
async fn test_native_reload_and_unload() {
    let registry = native_registry();
    load_configured_mock(&registry, "native", 0).await;
    registry.get_plugin("native").await.unwrap();

    registry.reload_plugin("native").await.unwrap();
    let plugins = registry.list_plugins().await;
    assert_eq!(plugins["native"].usage_count, 0);
    assert_eq!(plugins["native"].path, mock_module());
    assert_eq!(plugins["native"].metadata.channel_type, "mock");

    registry.unload_plugin("native").await.unwrap();
    assert!(matches!(
        registry.get_plugin("native").await,
        Err(RegistryError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_instances_outlive_dropped_registry() {
    let registry = native_registry();
    load_configured_mock(&registry, "native", 0).await;
    registry.load_plugin(mock_module(), "second").await.unwrap();
    let held = registry.get_plugin("native").await.unwrap();

    drop(registry);

    assert_eq!(held.metadata().unwrap().name, "Mock Payment Channel");
    let resp = held
        .balance_inquiry(&CallContext::new(), &BalanceInquiryRequest::default())
        .await
        .unwrap();
    assert!(resp.base.success);
    drop(held);

    // The same image is still usable by a fresh registry.
    let registry = native_registry();
    registry.load_plugin(mock_module(), "again").await.unwrap();
    assert!(registry.health_check().await["again"]);
}

#[test]
fn test_library_without_entry_point_is_rejected() {
    let path = fixture_module(&[]);
    let err = DylibLoader::new().load(&path).err().unwrap();
    match err {
        LoadError::EntryPointMissing { symbol, .. } => {
            assert_eq!(symbol, "PAYCHAN_PLUGIN_ENTRY");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_stale_abi_version_is_a_signature_mismatch() {
    let path = fixture_module(&["stale-abi"]);
    let err = DylibLoader::new().load(&path).err().unwrap();
    match err {
        LoadError::EntryPointSignatureMismatch { reason, .. } => {
            assert!(reason.contains("ABI"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_stale_core_version_is_a_signature_mismatch() {
    let path = fixture_module(&["stale-core"]);
    let err = DylibLoader::new().load(&path).err().unwrap();
    match err {
        LoadError::EntryPointSignatureMismatch { reason, .. } => {
            assert!(reason.contains("0.0.0-stale"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_cli_demo_on_native_module() {
    let mut cmd = Command::new(cargo_bin!("paychan"));
    cmd.args(["demo", "--channel-id", "native_mock", "--plugin"])
        .arg(mock_module());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("name:         Mock Payment Channel"))
        .stdout(predicate::str::contains("native_mock: healthy"))
        .stdout(predicate::str::contains("callback: processed="));
}
