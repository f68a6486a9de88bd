use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Catatan expense tracking server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "catatan-server", version, about = "Catatan expense tracking server")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "CATATAN_PORT", default_value = "3001")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "CATATAN_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./catatan.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "CATATAN_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Data directory for the SQLite database
    #[arg(long, env = "CATATAN_DATA_DIR", default_value = "./data")]
    pub data_dir: String,

    /// Allowed CORS origin for the web client
    #[arg(long, env = "CATATAN_CORS_ORIGIN", default_value = "http://localhost:5173")]
    pub cors_origin: String,

    /// Public base URL of this server, used to build the OAuth redirect URI
    #[arg(long, env = "CATATAN_PUBLIC_URL", default_value = "http://localhost:3001")]
    pub public_url: String,

    /// Google OAuth client id used to verify sign-in credentials.
    /// Google login returns 503 until this is set.
    #[arg(long, env = "CATATAN_GOOGLE_CLIENT_ID", default_value = "")]
    pub google_client_id: String,

    /// Google OAuth client secret for the server-side redirect flow
    #[arg(long, env = "CATATAN_GOOGLE_CLIENT_SECRET", default_value = "")]
    pub google_client_secret: String,

    /// Google OAuth client id for the Android app, exposed via /api/auth/config
    #[arg(long, env = "CATATAN_GOOGLE_ANDROID_CLIENT_ID", default_value = "")]
    pub google_android_client_id: String,

    /// Receipt OCR webhook URL. AI endpoints return 503 until this is set.
    #[arg(long, env = "CATATAN_WEBHOOK_URL", default_value = "")]
    pub webhook_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3001,
            bind_address: "0.0.0.0".to_string(),
            config: "./catatan.toml".to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
            cors_origin: "http://localhost:5173".to_string(),
            public_url: "http://localhost:3001".to_string(),
            google_client_id: String::new(),
            google_client_secret: String::new(),
            google_android_client_id: String::new(),
            webhook_url: String::new(),
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (CATATAN_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("CATATAN_"))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Catatan Server Configuration
# Place this file at ./catatan.toml or specify with --config <path>
# All settings can be overridden via environment variables (CATATAN_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 3001)
# port = 3001

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Data directory for the SQLite database
# data_dir = "./data"

# Allowed CORS origin for the web client
# cors_origin = "http://localhost:5173"

# Public base URL of this server. The OAuth redirect URI is
# <public_url>/api/auth/google/callback and must match the Google console.
# public_url = "http://localhost:3001"

# Google OAuth client id. Sign-in credentials are verified against this
# audience. Required for login to work.
# google_client_id = ""

# Google OAuth client secret. Required only for the server-side redirect
# flow (GET /api/auth/google); the credential flow works without it.
# google_client_secret = ""

# Google OAuth client id for the Android app (served by /api/auth/config)
# google_android_client_id = ""

# Receipt OCR webhook URL. Required for the AI receipt endpoints.
# webhook_url = ""
"#
    .to_string()
}
