use crate::errors::AppError;

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub server: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_address: String,
    pub jwt_secret: String,
    pub media_root: String,
    pub site_url: String,
    pub email_from: String,
    pub smtp: Option<SmtpSettings>,
}

fn required(key: &str) -> Result<String, AppError> {
    std::env::var(key)
        .ok()
        .filter(|val| !val.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("{key} must be set")))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|val| !val.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl Settings {
    /// Reads settings from the process environment. Call `dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, AppError> {
        let database_max_connections = optional("DATABASE_MAX_CONNECTIONS", "5")
            .parse::<u32>()
            .map_err(|_| AppError::Config("DATABASE_MAX_CONNECTIONS must be a number".to_string()))?;

        let smtp = match std::env::var("SMTP_SERVER") {
            Ok(server) if !server.trim().is_empty() => Some(SmtpSettings {
                server,
                username: required("SMTP_USERNAME")?,
                password: required("SMTP_PASSWORD")?,
            }),
            _ => None,
        };

        Ok(Settings {
            database_url: required("DATABASE_URL")?,
            database_max_connections,
            bind_address: optional("BIND_ADDRESS", "127.0.0.1:8080"),
            jwt_secret: required("JWT_SECRET")?,
            media_root: optional("MEDIA_ROOT", "media"),
            site_url: optional("SITE_URL", "http://localhost:8080"),
            email_from: optional("EMAIL_FROM", "no-reply@conectasaber.local"),
            smtp,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Settings {
            database_url: String::new(),
            database_max_connections: 1,
            bind_address: "127.0.0.1:0".to_string(),
            jwt_secret: "test-secret".to_string(),
            media_root: "media".to_string(),
            site_url: "http://testserver".to_string(),
            email_from: "no-reply@test.local".to_string(),
            smtp: None,
        }
    }
}
