use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: u64,
    pub chat_cap: usize,
    pub chat_join_slice: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            uploads_dir: PathBuf::from("./uploads"),
            max_upload_bytes: 2 * 1024 * 1024 * 1024,
            chat_cap: 100,
            chat_join_slice: 50,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("PORT") {
            match val.parse::<u16>() {
                Ok(port) => config.port = port,
                Err(_) => tracing::warn!(value = %val, "Invalid PORT, using default"),
            }
        }

        if let Ok(path) = std::env::var("UPLOADS_DIR") {
            config.uploads_dir = PathBuf::from(path);
        }

        if let Ok(val) = std::env::var("MAX_UPLOAD_BYTES") {
            match val.parse::<u64>() {
                Ok(n) if n > 0 => config.max_upload_bytes = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_UPLOAD_BYTES, using default"),
            }
        }

        if let Ok(val) = std::env::var("CHAT_CAP") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.chat_cap = n,
                _ => tracing::warn!(value = %val, "Invalid CHAT_CAP, using default"),
            }
        }

        if let Ok(val) = std::env::var("CHAT_JOIN_SLICE") {
            match val.parse::<usize>() {
                Ok(n) => config.chat_join_slice = n,
                Err(_) => tracing::warn!(value = %val, "Invalid CHAT_JOIN_SLICE, using default"),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.chat_cap, 100);
        assert_eq!(config.chat_join_slice, 50);
        assert_eq!(config.max_upload_bytes, 2 * 1024 * 1024 * 1024);
    }
}
