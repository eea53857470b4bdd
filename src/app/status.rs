use crate::config::Config;
use crate::remote_auth::SessionState;

pub fn render_status(config: &Config) -> String {
    let ra = &config.remote_auth;
    let mut lines = vec![
        "◆ zaprelay".to_string(),
        String::new(),
        format!("Version     {}", env!("CARGO_PKG_VERSION")),
        format!("Config      {}", config.config_path.display()),
        format!("Data dir    {}", config.data_dir().display()),
        String::new(),
        format!(
            "  Backend      {}",
            if ra.url.is_empty() { "(unset)" } else { ra.url.as_str() }
        ),
        format!(
            "  Token        {}",
            if ra.token.is_empty() { "(unset)" } else { "set" }
        ),
        format!("  Client id    {}", ra.client_id),
        format!("  Key prefix   {}", ra.key_prefix),
        format!("  Chunk size   {} chars", ra.max_chunk_chars),
        format!("  Backup every {}s", ra.backup_interval_ms / 1000),
        format!(
            "  Junk filter  {}",
            if ra.junk_filter { "on" } else { "off" }
        ),
        format!(
            "  Retries      {} (base {}ms, cap {}ms)",
            ra.retry.max_retries, ra.retry.retry_delay_ms, ra.retry.retry_max_delay_ms
        ),
        format!("  Log level    {}", config.observability.log_level),
    ];
    lines.push(String::new());
    lines.join("\n")
}

pub fn render_session_state(session: &str, state: &SessionState) -> String {
    match state {
        SessionState::Absent => format!("{session}: no stored session"),
        SessionState::Mono => format!("{session}: stored as a single value"),
        SessionState::Chunked(meta) => {
            let written = meta
                .written_at()
                .map_or_else(|| "unknown".to_string(), |t| t.to_rfc3339());
            format!(
                "{session}: stored in {} chunks, {} encoded chars, written {written}",
                meta.parts, meta.total_len
            )
        }
    }
}
