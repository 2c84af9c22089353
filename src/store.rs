//! Persisted provider configuration
//!
//! Provider settings (API keys, model names, enable flags, default provider)
//! live in a small SQLite database. Loading falls back through:
//! 1. SQLite database (primary)
//! 2. Legacy `ai-config.json` file (migrated into the database on first read)
//! 3. Environment-variable defaults for the built-in providers

use crate::{Error, Result};
use indexmap::IndexMap;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

const DB_FILE: &str = "config.db";
const LEGACY_JSON_FILE: &str = "ai-config.json";
const DEFAULT_PROVIDER_KEY: &str = "default_provider";

/// Persisted configuration record for one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Unique provider id (registry key)
    pub id: String,

    /// Human-readable name for display
    pub display_name: String,

    /// API key; empty means "not configured"
    pub api_key: String,

    /// Model name sent upstream
    pub model: String,

    /// API base URL
    pub base_url: String,

    /// Whether the provider may serve requests
    pub enabled: bool,
}

/// Partial update applied to a stored provider
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderUpdate {
    /// Replace the API key
    pub api_key: Option<String>,

    /// Replace the model name
    pub model: Option<String>,

    /// Replace the API base URL
    pub base_url: Option<String>,

    /// Replace the enabled flag
    pub enabled: Option<bool>,
}

impl ProviderUpdate {
    /// Whether the update carries any change at all
    pub fn is_empty(&self) -> bool {
        self.api_key.is_none()
            && self.model.is_none()
            && self.base_url.is_none()
            && self.enabled.is_none()
    }
}

/// Legacy JSON config file shape, kept for migration only
#[derive(Debug, Deserialize)]
struct LegacyConfig {
    #[serde(default)]
    providers: IndexMap<String, LegacyProvider>,
    #[serde(default = "default_provider_fallback")]
    default_provider: String,
}

#[derive(Debug, Deserialize)]
struct LegacyProvider {
    name: String,
    #[serde(default)]
    api_key: String,
    model: String,
    base_url: String,
    #[serde(default = "enabled_fallback")]
    enabled: bool,
}

fn default_provider_fallback() -> String {
    "claude".to_string()
}

fn enabled_fallback() -> bool {
    true
}

/// SQLite-backed provider configuration store.
///
/// Reads may race safely during request handling; writes are serialized
/// through the interior mutex.
pub struct ConfigStore {
    conn: Mutex<Connection>,
    data_dir: PathBuf,
}

impl ConfigStore {
    /// Open (or create) the store inside `data_dir`.
    ///
    /// On first open with an empty database, settings are seeded from the
    /// legacy JSON file if present, otherwise from environment defaults.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .map_err(|e| Error::Config(format!("cannot create data dir: {}", e)))?;

        let conn = Connection::open(data_dir.join(DB_FILE))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS providers (
                id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                api_key TEXT NOT NULL,
                model TEXT NOT NULL,
                base_url TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1
            );
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT
            );",
        )?;

        let store = ConfigStore {
            conn: Mutex::new(conn),
            data_dir,
        };
        store.seed_if_empty()?;
        Ok(store)
    }

    fn seed_if_empty(&self) -> Result<()> {
        if !self.is_empty()? {
            return Ok(());
        }

        let legacy = self.data_dir.join(LEGACY_JSON_FILE);
        if legacy.exists() {
            match Self::load_legacy(&legacy) {
                Ok((providers, default)) => {
                    info!("Migrating {} providers from {}", providers.len(), legacy.display());
                    self.replace_all(&providers, &default)?;
                    return Ok(());
                }
                Err(e) => {
                    info!("Ignoring unreadable legacy config {}: {}", legacy.display(), e);
                }
            }
        }

        let default = std::env::var("DEFAULT_AI_PROVIDER").unwrap_or_else(|_| "claude".into());
        self.replace_all(&default_providers(), &default)?;
        Ok(())
    }

    fn is_empty(&self) -> Result<bool> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM providers", [], |row| row.get(0))?;
        Ok(count == 0)
    }

    fn load_legacy(path: &Path) -> Result<(Vec<ProviderDescriptor>, String)> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let legacy: LegacyConfig = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("invalid legacy config: {}", e)))?;

        let providers = legacy
            .providers
            .into_iter()
            .map(|(id, p)| ProviderDescriptor {
                id,
                display_name: p.name,
                api_key: p.api_key,
                model: p.model,
                base_url: p.base_url,
                enabled: p.enabled,
            })
            .collect();
        Ok((providers, legacy.default_provider))
    }

    fn replace_all(&self, providers: &[ProviderDescriptor], default: &str) -> Result<()> {
        let mut conn = self.conn.lock().expect("store mutex poisoned");
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM providers", [])?;
        for p in providers {
            tx.execute(
                "INSERT INTO providers (id, display_name, api_key, model, base_url, enabled)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![p.id, p.display_name, p.api_key, p.model, p.base_url, p.enabled as i64],
            )?;
        }
        tx.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![DEFAULT_PROVIDER_KEY, default],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Look up one provider descriptor
    pub fn descriptor(&self, id: &str) -> Result<Option<ProviderDescriptor>> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let row = conn
            .query_row(
                "SELECT id, display_name, api_key, model, base_url, enabled
                 FROM providers WHERE id = ?1",
                params![id],
                row_to_descriptor,
            )
            .optional()?;
        Ok(row)
    }

    /// The configured default provider id
    pub fn default_provider_id(&self) -> Result<String> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![DEFAULT_PROVIDER_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.unwrap_or_else(|| "claude".to_string()))
    }

    /// All provider descriptors, in insertion order
    pub fn list(&self) -> Result<IndexMap<String, ProviderDescriptor>> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, display_name, api_key, model, base_url, enabled
             FROM providers ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], row_to_descriptor)?;

        let mut providers = IndexMap::new();
        for row in rows {
            let descriptor = row?;
            providers.insert(descriptor.id.clone(), descriptor);
        }
        Ok(providers)
    }

    /// Apply a partial update to one provider, returning the new descriptor
    pub fn update_provider(&self, id: &str, update: ProviderUpdate) -> Result<ProviderDescriptor> {
        let mut current = self
            .descriptor(id)?
            .ok_or_else(|| Error::ProviderNotFound(id.to_string()))?;

        if let Some(api_key) = update.api_key {
            current.api_key = api_key;
        }
        if let Some(model) = update.model {
            current.model = model;
        }
        if let Some(base_url) = update.base_url {
            current.base_url = base_url;
        }
        if let Some(enabled) = update.enabled {
            current.enabled = enabled;
        }

        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            "UPDATE providers SET api_key = ?2, model = ?3, base_url = ?4, enabled = ?5
             WHERE id = ?1",
            params![
                id,
                current.api_key,
                current.model,
                current.base_url,
                current.enabled as i64
            ],
        )?;
        Ok(current)
    }

    /// Set the default provider; the id must exist in the store
    pub fn set_default_provider(&self, id: &str) -> Result<()> {
        if self.descriptor(id)?.is_none() {
            return Err(Error::ProviderNotFound(id.to_string()));
        }
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![DEFAULT_PROVIDER_KEY, id],
        )?;
        Ok(())
    }

    /// Restore the built-in provider set and default, discarding stored keys
    pub fn reset(&self) -> Result<IndexMap<String, ProviderDescriptor>> {
        self.replace_all(&default_providers(), "claude")?;
        self.list()
    }
}

fn row_to_descriptor(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProviderDescriptor> {
    Ok(ProviderDescriptor {
        id: row.get(0)?,
        display_name: row.get(1)?,
        api_key: row.get(2)?,
        model: row.get(3)?,
        base_url: row.get(4)?,
        enabled: row.get::<_, i64>(5)? != 0,
    })
}

fn env_or(key: &str, fallback: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| fallback.to_string())
}

/// Built-in provider configurations, keyed off environment variables
fn default_providers() -> Vec<ProviderDescriptor> {
    vec![
        ProviderDescriptor {
            id: "claude".into(),
            display_name: "Claude (Anthropic)".into(),
            api_key: env_or("ANTHROPIC_API_KEY", ""),
            model: env_or("CLAUDE_MODEL", "claude-sonnet-4-20250514"),
            base_url: "https://api.anthropic.com".into(),
            enabled: true,
        },
        ProviderDescriptor {
            id: "openai".into(),
            display_name: "GPT (OpenAI)".into(),
            api_key: env_or("OPENAI_API_KEY", ""),
            model: env_or("OPENAI_MODEL", "gpt-4o"),
            base_url: "https://api.openai.com/v1".into(),
            enabled: true,
        },
        ProviderDescriptor {
            id: "gemini-pro".into(),
            display_name: "Gemini (Pro)".into(),
            api_key: env_or("GOOGLE_API_KEY", ""),
            model: env_or("GEMINI_PRO_MODEL", "gemini-1.5-pro"),
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            enabled: true,
        },
        ProviderDescriptor {
            id: "gemini-flash".into(),
            display_name: "Gemini (Flash)".into(),
            api_key: env_or("GOOGLE_API_KEY", ""),
            model: env_or("GEMINI_FLASH_MODEL", "gemini-2.0-flash-exp"),
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            enabled: true,
        },
        ProviderDescriptor {
            id: "moonshot".into(),
            display_name: "Moonshot (Kimi)".into(),
            api_key: env_or("MOONSHOT_API_KEY", ""),
            model: env_or("MOONSHOT_MODEL", "kimi-k2-0905-preview"),
            base_url: "https://api.moonshot.ai/v1".into(),
            enabled: true,
        },
        ProviderDescriptor {
            id: "perplexity".into(),
            display_name: "Perplexity".into(),
            api_key: env_or("PERPLEXITY_API_KEY", ""),
            model: env_or("PERPLEXITY_MODEL", "llama-3.1-sonar-large-128k-online"),
            base_url: "https://api.perplexity.ai".into(),
            enabled: true,
        },
    ]
}

/// Mask an API key for display: first 8 and last 4 characters visible,
/// everything else starred. Short keys are fully starred.
pub fn mask_api_key(api_key: &str) -> String {
    let chars: Vec<char> = api_key.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 12), tail)
}
