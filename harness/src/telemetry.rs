use tracing::Subscriber;
use tracing::subscriber::set_global_default;
use tracing_log::LogTracer;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

/// Log an error if it exists using the alternate selector, which emits the
/// error chain.
pub fn log_error(e: impl Into<anyhow::Error>) {
    let e: anyhow::Error = e.into();
    tracing::error!("{e:#}");
}

pub fn get_subscriber(env_filter: String) -> impl Subscriber + Sync + Send {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(env_filter));
    let stderr = fmt::Layer::new()
        .with_writer(std::io::stderr)
        .pretty()
        .with_span_events(fmt::format::FmtSpan::CLOSE);
    Registry::default().with(env_filter).with(stderr)
}

/// Register a subscriber as global default to process span data.
///
/// It should only be called once!
pub fn init_subscriber(subscriber: impl Subscriber + Sync + Send) {
    LogTracer::init().expect("Failed to set logger");
    set_global_default(subscriber).expect("Failed to set subscriber");
}

/// Install a subscriber for a test process. Safe to call from every test;
/// calls after the first are ignored.
///
/// ```shell
/// RUST_LOG=harness=debug,ui_tests=debug cargo test -- --nocapture
/// ```
pub fn init_test_logging() {
    let subscriber = get_subscriber("info".into());
    let _ = subscriber.try_init();
}
