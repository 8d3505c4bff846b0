use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Settings for the email verification flow.
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    pub frontend_base_url: String,
    pub token_ttl_hours: i64,
}

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpTls {
    /// Plain connection upgraded with STARTTLS.
    Starttls,
    /// TLS from the first byte (SMTPS).
    Tls,
    /// No encryption at all; only for local relays without credentials.
    None,
}

impl std::str::FromStr for SmtpTls {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "starttls" => Ok(Self::Starttls),
            "tls" | "smtps" => Ok(Self::Tls),
            "none" | "plain" => Ok(Self::None),
            other => anyhow::bail!("unknown SMTP_TLS mode {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub enabled: bool,
    pub from: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub tls: SmtpTls,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub verification: VerificationConfig,
    pub mail: MailConfig,
}

pub const DEFAULT_FRONTEND_BASE_URL: &str = "http://localhost:5173";
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
pub const DEFAULT_MAIL_FROM: &str = "no-reply@travel-app.local";
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;
pub const MAX_JWT_TTL_MINUTES: i64 = 60 * 24 * 365;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: env_or("JWT_ISSUER", "travelauth"),
            audience: env_or("JWT_AUDIENCE", "travelauth-users"),
            ttl_minutes: env_parse("JWT_TTL_MINUTES", 60),
        };
        let verification = VerificationConfig {
            frontend_base_url: env_or("FRONTEND_BASE_URL", DEFAULT_FRONTEND_BASE_URL),
            token_ttl_hours: env_parse("VERIFICATION_TOKEN_TTL_HOURS", DEFAULT_TOKEN_TTL_HOURS),
        };
        let mail = MailConfig {
            enabled: env_parse("MAIL_ENABLED", true),
            from: env_or("MAIL_FROM", DEFAULT_MAIL_FROM),
            smtp_host: env_or("SMTP_HOST", "localhost"),
            smtp_port: env_parse("SMTP_PORT", 587),
            smtp_username: env_opt("SMTP_USERNAME"),
            smtp_password: env_opt("SMTP_PASSWORD"),
            tls: match env_opt("SMTP_TLS") {
                Some(mode) => mode.parse()?,
                None => SmtpTls::Starttls,
            },
            timeout_secs: env_parse("SMTP_TIMEOUT_SECS", 30),
        };
        let config = Self {
            database_url,
            jwt,
            verification,
            mail,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make tokens unusable or overflow timestamp math.
    pub fn validate(&self) -> anyhow::Result<()> {
        let ttl = self.verification.token_ttl_hours;
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&ttl) {
            anyhow::bail!(
                "VERIFICATION_TOKEN_TTL_HOURS must be between 1 and {MAX_TOKEN_TTL_HOURS}, got {ttl}"
            );
        }
        let ttl = self.jwt.ttl_minutes;
        if !(1..=MAX_JWT_TTL_MINUTES).contains(&ttl) {
            anyhow::bail!("JWT_TTL_MINUTES must be between 1 and {MAX_JWT_TTL_MINUTES}, got {ttl}");
        }
        if self.mail.tls == SmtpTls::None && self.mail.smtp_username.is_some() {
            anyhow::bail!("SMTP credentials require SMTP_TLS=starttls or SMTP_TLS=tls");
        }
        Ok(())
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            frontend_base_url: DEFAULT_FRONTEND_BASE_URL.into(),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
        }
    }
}
