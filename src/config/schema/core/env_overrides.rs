use super::Config;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) =
            std::env::var("ZAPRELAY_KV_URL").or_else(|_| std::env::var("UPSTASH_REDIS_REST_URL"))
            && !url.is_empty()
        {
            self.remote_auth.url = url;
        }

        if let Ok(token) = std::env::var("ZAPRELAY_KV_TOKEN")
            .or_else(|_| std::env::var("UPSTASH_REDIS_REST_TOKEN"))
            && !token.is_empty()
        {
            self.remote_auth.token = token;
        }

        if let Ok(client_id) =
            std::env::var("ZAPRELAY_CLIENT_ID").or_else(|_| std::env::var("REMOTEAUTH_CLIENT_ID"))
            && !client_id.is_empty()
        {
            self.remote_auth.client_id = client_id;
        }

        if let Ok(max_str) = std::env::var("ZAPRELAY_MAX_CHUNK_CHARS")
            .or_else(|_| std::env::var("REMOTEAUTH_MAX_CHUNK_CHARS"))
            && let Ok(max) = max_str.parse::<usize>()
        {
            self.remote_auth.max_chunk_chars = max;
        }

        if let Ok(every_str) =
            std::env::var("ZAPRELAY_BACKUP_EVERY_MS").or_else(|_| std::env::var("BACKUP_EVERY_MS"))
            && let Ok(every) = every_str.parse::<u64>()
        {
            self.remote_auth.backup_interval_ms = every;
        }

        if let Ok(level) = std::env::var("ZAPRELAY_LOG_LEVEL")
            && !level.is_empty()
        {
            self.observability.log_level = level;
        }
    }
}
