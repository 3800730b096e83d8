use jungle_engine::config::EngineConfig;
use jungle_engine::protocol::Engine;

fn main() {
    // Structured logging goes to stderr; stdout is the protocol channel.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jungle_engine=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = EngineConfig::from_env();
    tracing::info!(
        "jungle-engine v{} ready ({} MB hash)",
        env!("CARGO_PKG_VERSION"),
        config.hash_mb
    );

    Engine::new(config).run();
}
