use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use paychan::application::bootstrap::load_manifest;
use paychan::application::dispatch::PaymentDispatcher;
use paychan::application::registry::PluginRegistry;
use paychan::domain::context::CallContext;
use paychan::domain::messages::{
    BalanceInquiryRequest, BaseRequest, CallbackRequest, CollectOrderRequest,
    CollectQueryRequest, CustomerInfo, PayoutOrderRequest, PayoutQueryRequest, RecipientInfo,
};
use paychan::domain::metadata::PluginConfig;
use paychan::domain::ports::ModuleLoaderBox;
use paychan::infrastructure::dylib::DylibLoader;
use paychan::infrastructure::in_memory::InMemoryModuleLoader;
use paychan::interfaces::csv::snapshot_writer::SnapshotWriter;
use paychan::interfaces::manifest::ChannelManifest;
use rust_decimal_macros::dec;
use serde_json::json;
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Default log filter; `RUST_LOG` takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load one module and exercise every payment operation.
    Demo {
        #[command(flatten)]
        source: ModuleSource,

        /// Channel id to register the module under.
        #[arg(long, default_value = "mock_channel")]
        channel_id: String,
    },
    /// Load every channel listed in a JSON manifest.
    Load {
        /// Path to the channel manifest.
        #[arg(long)]
        manifest: PathBuf,

        /// Resolve module paths against the built-in module table.
        #[arg(long)]
        builtin: bool,
    },
    /// Drive collect orders through the dispatcher and report throughput.
    Bench {
        #[command(flatten)]
        source: ModuleSource,

        #[arg(long, default_value_t = 10)]
        concurrency: usize,

        #[arg(long, default_value_t = 1000)]
        requests: u64,
    },
}

#[derive(Args)]
struct ModuleSource {
    /// Module to load: a shared library path, or a built-in name with --builtin.
    #[arg(long)]
    plugin: PathBuf,

    /// Resolve --plugin against the built-in module table.
    #[arg(long)]
    builtin: bool,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(io::stderr))
            .init();
    }
}

fn build_loader(builtin: bool) -> ModuleLoaderBox {
    if builtin {
        Box::new(InMemoryModuleLoader::with_builtins())
    } else {
        if !DylibLoader::is_supported() {
            warn!("this build cannot open native modules; only --builtin modules will load");
        }
        Box::new(DylibLoader::new())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "paychan starting");

    match cli.command {
        Command::Demo { source, channel_id } => demo(source, &channel_id).await,
        Command::Load { manifest, builtin } => load(manifest, builtin).await,
        Command::Bench {
            source,
            concurrency,
            requests,
        } => bench(source, concurrency, requests).await,
    }
}

async fn demo(source: ModuleSource, channel_id: &str) -> Result<()> {
    let registry = Arc::new(PluginRegistry::new(build_loader(source.builtin)));
    registry.load_plugin(&source.plugin, channel_id).await?;

    let metadata = registry.get_plugin_metadata(channel_id).await?;
    println!("Plugin information:");
    println!("  name:         {}", metadata.name);
    println!("  version:      {}", metadata.version);
    println!("  description:  {}", metadata.description);
    println!("  channel type: {}", metadata.channel_type);
    println!(
        "  capabilities: {}",
        metadata
            .capabilities
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    );

    let config = demo_config(json!({ "mock_delay_ms": 50, "success_rate": 0.9 }));
    registry.configure_plugin(channel_id, &config).await?;

    let dispatcher = PaymentDispatcher::new(registry.clone());
    let ctx = CallContext::with_timeout(Duration::from_secs(30));
    let base = || {
        let mut base = BaseRequest::new("MERCHANT_001", channel_id, next_request_id());
        base.extra_params = HashMap::from([("test".to_string(), "true".to_string())]);
        base
    };

    let collect = CollectOrderRequest {
        base: base(),
        order_id: "ORDER_001".to_string(),
        amount: dec!(100.50),
        currency: "CNY".to_string(),
        description: "Test payment for demo".to_string(),
        return_url: "https://example.com/return".to_string(),
        notify_url: "https://example.com/notify".to_string(),
        customer_info: Some(CustomerInfo {
            name: "John Doe".to_string(),
            email: "john@example.com".to_string(),
            ..Default::default()
        }),
    };
    match dispatcher.collect_order(channel_id, &ctx, &collect).await {
        Ok(resp) => println!(
            "collect_order: {} {} {} {} ({})",
            resp.order_id, resp.channel_order_id, resp.amount, resp.currency, resp.status
        ),
        Err(e) => warn!(error = %e, "collect_order failed"),
    }

    let balance = BalanceInquiryRequest {
        base: base(),
        account_type: "settlement".to_string(),
    };
    match dispatcher.balance_inquiry(channel_id, &ctx, &balance).await {
        Ok(resp) => println!(
            "balance_inquiry: {} {} ({})",
            resp.balance, resp.currency, resp.account_type
        ),
        Err(e) => warn!(error = %e, "balance_inquiry failed"),
    }

    let payout = PayoutOrderRequest {
        base: base(),
        order_id: "PAYOUT_001".to_string(),
        amount: dec!(50.00),
        currency: "CNY".to_string(),
        description: "Test payout for demo".to_string(),
        notify_url: "https://example.com/payout-notify".to_string(),
        recipient_info: Some(RecipientInfo {
            name: "Jane Smith".to_string(),
            bank_account: "6222021234567890123".to_string(),
            bank_code: "ICBC".to_string(),
            bank_name: "Industrial and Commercial Bank of China".to_string(),
            ..Default::default()
        }),
    };
    match dispatcher.payout_order(channel_id, &ctx, &payout).await {
        Ok(resp) => println!(
            "payout_order: {} {} {} {} ({})",
            resp.order_id, resp.channel_order_id, resp.amount, resp.currency, resp.status
        ),
        Err(e) => warn!(error = %e, "payout_order failed"),
    }

    let collect_query = CollectQueryRequest {
        base: base(),
        order_id: "ORDER_001".to_string(),
        channel_order_id: None,
    };
    match dispatcher.collect_query(channel_id, &ctx, &collect_query).await {
        Ok(resp) => println!("collect_query: {} ({})", resp.order_id, resp.status),
        Err(e) => warn!(error = %e, "collect_query failed"),
    }

    let payout_query = PayoutQueryRequest {
        base: base(),
        order_id: "PAYOUT_001".to_string(),
        channel_order_id: None,
    };
    match dispatcher.payout_query(channel_id, &ctx, &payout_query).await {
        Ok(resp) => println!("payout_query: {} ({})", resp.order_id, resp.status),
        Err(e) => warn!(error = %e, "payout_query failed"),
    }

    let callback = CallbackRequest {
        base: base(),
        callback_type: "payment_notification".to_string(),
        callback_data: HashMap::from([
            ("order_id".to_string(), json!("ORDER_001")),
            ("status".to_string(), json!("paid")),
        ]),
        signature: "mock_signature_12345".to_string(),
    };
    match dispatcher.callback(channel_id, &ctx, &callback).await {
        Ok(resp) => println!("callback: processed={}", resp.processed),
        Err(e) => warn!(error = %e, "callback failed"),
    }

    report(&registry).await
}

async fn load(manifest_path: PathBuf, builtin: bool) -> Result<()> {
    // Built-in module names are not filesystem paths, so they stay unresolved.
    let manifest = if builtin {
        ChannelManifest::from_reader(File::open(&manifest_path).into_diagnostic()?)?
    } else {
        ChannelManifest::from_path(&manifest_path)?
    };

    let registry = PluginRegistry::new(build_loader(builtin));
    let outcomes = load_manifest(&registry, &manifest).await;

    for outcome in &outcomes {
        if let Err(e) = &outcome.result {
            eprintln!("Error loading channel {}: {}", outcome.channel_id, e);
        }
    }

    report(&registry).await?;

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed > 0 {
        return Err(miette!("{failed} channel(s) failed to load"));
    }
    Ok(())
}

async fn bench(source: ModuleSource, concurrency: usize, requests: u64) -> Result<()> {
    let channel_id = "bench";
    let registry = Arc::new(PluginRegistry::new(build_loader(source.builtin)));
    registry.load_plugin(&source.plugin, channel_id).await?;
    let config = demo_config(json!({ "mock_delay_ms": 1, "success_rate": 1.0 }));
    registry.configure_plugin(channel_id, &config).await?;

    let dispatcher = PaymentDispatcher::new(registry.clone());
    let next = Arc::new(AtomicU64::new(0));
    let started = Instant::now();

    let mut workers = Vec::with_capacity(concurrency.max(1));
    for worker in 0..concurrency.max(1) {
        let dispatcher = dispatcher.clone();
        let next = next.clone();
        workers.push(tokio::spawn(async move {
            let mut stats = BenchStats::default();
            let ctx = CallContext::new();
            loop {
                let n = next.fetch_add(1, Ordering::Relaxed);
                if n >= requests {
                    break;
                }
                let req = CollectOrderRequest {
                    base: BaseRequest::new("PERF_TEST", channel_id, format!("PERF_{worker}_{n}")),
                    order_id: format!("PERF_ORDER_{n}"),
                    amount: dec!(1.00),
                    currency: "CNY".to_string(),
                    ..Default::default()
                };
                let start = Instant::now();
                let ok = matches!(
                    dispatcher.collect_order(channel_id, &ctx, &req).await,
                    Ok(resp) if resp.base.success
                );
                stats.record(start.elapsed(), ok);
            }
            stats
        }));
    }

    let mut total = BenchStats::default();
    for worker in workers {
        total.merge(worker.await.into_diagnostic()?);
    }
    let elapsed = started.elapsed();

    let count = total.succeeded + total.failed;
    println!("requests:    {count}");
    println!("succeeded:   {}", total.succeeded);
    println!("failed:      {}", total.failed);
    println!("concurrency: {concurrency}");
    println!("duration:    {elapsed:?}");
    if count > 0 {
        println!("latency min: {:?}", total.min);
        println!("latency avg: {:?}", total.sum / count as u32);
        println!("latency max: {:?}", total.max);
        println!(
            "throughput:  {:.2} req/s",
            count as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
        );
    }

    report(&registry).await
}

#[derive(Default)]
struct BenchStats {
    succeeded: u64,
    failed: u64,
    sum: Duration,
    min: Duration,
    max: Duration,
}

impl BenchStats {
    fn record(&mut self, latency: Duration, ok: bool) {
        if ok {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        let first = self.succeeded + self.failed == 1;
        self.sum += latency;
        self.min = if first { latency } else { self.min.min(latency) };
        self.max = self.max.max(latency);
    }

    fn merge(&mut self, other: BenchStats) {
        if other.succeeded + other.failed == 0 {
            return;
        }
        let empty = self.succeeded + self.failed == 0;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.sum += other.sum;
        self.min = if empty { other.min } else { self.min.min(other.min) };
        self.max = self.max.max(other.max);
    }
}

/// Prints health and the registry snapshot; CSV goes to stdout.
async fn report(registry: &PluginRegistry) -> Result<()> {
    let mut health: Vec<_> = registry.health_check().await.into_iter().collect();
    health.sort();
    println!("Health:");
    for (channel_id, healthy) in health {
        println!(
            "  {channel_id}: {}",
            if healthy { "healthy" } else { "unhealthy" }
        );
    }

    println!("Loaded plugins:");
    let snapshots = registry.list_plugins().await;
    let stdout = io::stdout();
    let mut writer = SnapshotWriter::new(stdout.lock());
    writer
        .write_snapshots(snapshots.values())
        .into_diagnostic()?;
    Ok(())
}

fn demo_config(value: serde_json::Value) -> PluginConfig {
    match value {
        serde_json::Value::Object(map) => map,
        _ => PluginConfig::new(),
    }
}

fn next_request_id() -> String {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    format!(
        "REQ_{}_{}",
        chrono::Utc::now().timestamp_millis(),
        SEQ.fetch_add(1, Ordering::Relaxed)
    )
}
