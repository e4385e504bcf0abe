use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "folio-server", about = "Blog API over a flat JSON file")]
pub struct Config {
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind: String,

    #[arg(long, env = "DB_PATH", default_value = "./api-data/db.json")]
    pub db_path: PathBuf,

    /// HMAC secret used to sign bearer and verification tokens.
    #[arg(long, env = "SECRET_AUTH", hide_env_values = true)]
    pub secret_auth: String,

    /// Directory holding the built front end.
    #[arg(long, env = "BUILD_DIR", default_value = "dist")]
    pub build_dir: PathBuf,

    /// Substituted for `{{CSS_PATH}}` in index.html.
    #[arg(long, env = "CSS_PATH", default_value = "/css/index.css")]
    pub css_path: String,

    /// Origin used in verification links when the request has no Origin header.
    #[arg(long, env = "PUBLIC_URL", default_value = "http://localhost:5000")]
    pub public_url: String,

    /// Bearer token lifetime in seconds.
    #[arg(
        long,
        env = "TOKEN_TTL_SECS",
        default_value_t = 3600,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub token_ttl_secs: u32,
}

impl Config {
    /// Loads `.env` if present, then parses flags with env fallbacks.
    pub fn load() -> Self {
        let _ = dotenv::dotenv();
        Self::parse()
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.token_ttl_secs))
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.bind, self.port).parse()
    }

    pub fn index_html_path(&self) -> PathBuf {
        self.build_dir.join("index.html")
    }

    /// Settings for tests and embedding; everything but the secret at its default.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            port: 3000,
            bind: "0.0.0.0".to_string(),
            db_path: PathBuf::from("./api-data/db.json"),
            secret_auth: secret.into(),
            build_dir: PathBuf::from("dist"),
            css_path: "/css/index.css".to_string(),
            public_url: "http://localhost:5000".to_string(),
            token_ttl_secs: 3600,
        }
    }
}
