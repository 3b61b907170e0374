use std::env;
use std::path::PathBuf;

use chrono::FixedOffset;

use crate::error::ConfigError;

/// Process configuration, read once at startup from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub item_id_prefix: String,
    pub plasmid_id_prefix: String,
    pub lab_offset: FixedOffset,
    pub approval_email: Option<String>,
    pub public_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: e.to_string(),
            })?,
            None => 3000,
        };

        let offset_minutes = match get("LAB_UTC_OFFSET_MINUTES") {
            Some(raw) => raw.parse::<i32>().map_err(|e| ConfigError::Invalid {
                name: "LAB_UTC_OFFSET_MINUTES",
                reason: e.to_string(),
            })?,
            None => 0,
        };
        let lab_offset = FixedOffset::east_opt(offset_minutes * 60).ok_or(ConfigError::Invalid {
            name: "LAB_UTC_OFFSET_MINUTES",
            reason: format!("{} minutes is outside +/- 24h", offset_minutes),
        })?;

        let item_id_prefix = get("ITEM_ID_PREFIX").unwrap_or_else(|| "LAB".to_string());
        let plasmid_id_prefix = get("PLASMID_ID_PREFIX").unwrap_or_else(|| "PLS".to_string());
        if item_id_prefix == plasmid_id_prefix {
            return Err(ConfigError::Invalid {
                name: "PLASMID_ID_PREFIX",
                reason: "must differ from ITEM_ID_PREFIX".to_string(),
            });
        }

        Ok(Self {
            database_url,
            jwt_secret,
            port,
            upload_dir: get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static/uploads")),
            item_id_prefix,
            plasmid_id_prefix,
            lab_offset,
            approval_email: get("APPROVAL_EMAIL"),
            public_base_url: get("PUBLIC_BASE_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}
