//! Startup configuration, read once from the environment (§6, §10.3).

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub scan_data_dir: PathBuf,
    pub public_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("API_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);
        let scan_data_dir = std::env::var("SCAN_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::current_dir().unwrap_or_default().join("scan-data"));
        let public_dir = std::env::var("PUBLIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::current_dir().unwrap_or_default().join("public"));
        Self { port, scan_data_dir, public_dir }
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
