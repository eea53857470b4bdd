use crate::config::ObservabilityConfig;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Map a config level name to a tracing level. Case-insensitive;
/// "warning" is accepted for "warn".
pub fn parse_level(name: &str) -> Option<Level> {
    let name = name.trim();
    if name.eq_ignore_ascii_case("warning") {
        return Some(Level::WARN);
    }
    name.parse().ok()
}

/// Each `-v` lowers the threshold one step, down to TRACE.
pub fn effective_level(base: Level, verbose: u8) -> Level {
    const ORDER: [Level; 5] = [
        Level::ERROR,
        Level::WARN,
        Level::INFO,
        Level::DEBUG,
        Level::TRACE,
    ];
    let start = ORDER.iter().position(|l| *l == base).unwrap_or(2);
    ORDER[(start + usize::from(verbose)).min(ORDER.len() - 1)]
}

/// Install the global fmt subscriber. Unknown level names fall back to INFO.
pub fn init_logging(config: &ObservabilityConfig, verbose: u8) -> anyhow::Result<()> {
    let base = parse_level(&config.log_level);
    let level = effective_level(base.unwrap_or(Level::INFO), verbose);

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("setting default subscriber failed: {e}"))?;

    if base.is_none() {
        tracing::warn!(
            "Unknown log level '{}', falling back to info",
            config.log_level
        );
    }
    Ok(())
}
