use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    pub qr_min_dimension: u32,
    pub scan_session_ttl_minutes: i64,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "college-connect".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "college-connect-users".into()),
        };
        Ok(Self {
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", 10),
            jwt,
            qr_min_dimension: env_parse("QR_MIN_DIMENSION", 200),
            scan_session_ttl_minutes: env_parse("SCAN_SESSION_TTL_MINUTES", 30),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_parse_falls_back_on_garbage() {
        std::env::set_var("COLLEGE_CONNECT_TEST_QR", "not-a-number");
        assert_eq!(env_parse("COLLEGE_CONNECT_TEST_QR", 200u32), 200);
        std::env::set_var("COLLEGE_CONNECT_TEST_QR", "320");
        assert_eq!(env_parse("COLLEGE_CONNECT_TEST_QR", 200u32), 320);
        assert_eq!(env_parse("COLLEGE_CONNECT_TEST_UNSET", 7u32), 7);
    }
}
