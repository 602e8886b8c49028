//! tfd-config
//!
//! Layered configuration for the filing services.
//!
//! Goals:
//! - YAML layers merged in order; later documents override earlier ones
//! - Canonical JSON + SHA-256 `config_hash` so two processes can prove they
//!   run the same effective config
//! - Config files carry env var NAMES, never credential material; loading
//!   aborts when a leaf value looks like a pasted secret
//! - Typed [`FilingConfig`] view with bounds checks and a rule-catalog
//!   version pin

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

/// Secret-like value prefixes. If any leaf string in the effective config
/// starts with one of these, the load aborts with CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // Stripe / OpenAI style
    "sk_live",    // Stripe live
    "sk_test",    // Stripe test
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "gho_",       // GitHub OAuth
    "glpat-",     // GitLab PAT
    "xoxb-",      // Slack bot token
    "xoxp-",      // Slack user token
];

/// Effective configuration produced by the layered loader.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

/// Read YAML files from disk and merge them in path order.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for path in paths {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read yaml path: {path}"))?;
        docs.push(raw);
    }
    let doc_refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

/// Merge YAML documents in order, reject secret literals, then hash the
/// canonical JSON form.
pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let as_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let as_json = serde_json::to_value(as_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, as_json);
    }

    scan_for_secret_literals(&merged, "")?;

    let canonical_json = canonical_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Object keys merge recursively; any other overlay value replaces the base
/// value outright, arrays included.
fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_val) => deep_merge(base_val, overlay_val),
                    None => overlay_val,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay_scalar) => overlay_scalar,
    }
}

/// serde_json's Map is BTreeMap-backed, so object keys already serialize in
/// sorted order. Compact form, no trailing newline.
fn canonical_json(v: &Value) -> Result<String> {
    serde_json::to_string(v).context("canonical json serialize failed")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Walk the config tree carrying the JSON pointer of the current node.
/// The error names the leaf pointer only; the value is never echoed.
fn scan_for_secret_literals(v: &Value, pointer: &str) -> Result<()> {
    match v {
        Value::Object(map) => {
            for (key, child) in map {
                let next = format!("{pointer}/{}", escape_pointer_token(key));
                scan_for_secret_literals(child, &next)?;
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                let next = format!("{pointer}/{i}");
                scan_for_secret_literals(child, &next)?;
            }
        }
        Value::String(s) if looks_like_secret(s) => {
            let leaf = if pointer.is_empty() { "/" } else { pointer };
            bail!("CONFIG_SECRET_DETECTED leaf={leaf} value=REDACTED");
        }
        _ => {}
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

// ---------------------------------------------------------------------------
// Typed view
// ---------------------------------------------------------------------------

/// The slice of the effective config the filing services actually read.
///
/// Pointers:
/// - `/authority/base_url`                   required
/// - `/authority/api_key_env`                optional; env var NAME
/// - `/authority/submit_timeout_ms`          default 10_000, 1..=120_000
/// - `/filing/reconcile_freshness_bound_ms`  default 3_600_000, must be > 0
/// - `/filing/max_attempts`                  default 5, 1..=20
/// - `/rules/catalog_version`                required; see [`FilingConfig::ensure_catalog_pin`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingConfig {
    pub authority_base_url: String,
    pub authority_api_key_env: Option<String>,
    pub submit_timeout_ms: u64,
    pub reconcile_freshness_bound_ms: i64,
    pub max_filing_attempts: u32,
    pub catalog_version_pin: String,
}

impl FilingConfig {
    /// Build from canonical config JSON (produced by the layered loader).
    pub fn from_config_json(cfg: &Value) -> Result<Self> {
        let authority_base_url = cfg
            .pointer("/authority/base_url")
            .and_then(Value::as_str)
            .context("config missing authority.base_url")?
            .trim_end_matches('/')
            .to_string();

        let authority_api_key_env = cfg
            .pointer("/authority/api_key_env")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let submit_timeout_ms = read_u64_at(cfg, "/authority/submit_timeout_ms", 10_000)?;
        if !(1..=120_000).contains(&submit_timeout_ms) {
            bail!("authority.submit_timeout_ms out of bounds (1..=120000): {submit_timeout_ms}");
        }

        let freshness = read_u64_at(cfg, "/filing/reconcile_freshness_bound_ms", 3_600_000)?;
        if freshness == 0 {
            bail!("filing.reconcile_freshness_bound_ms must be positive");
        }
        if freshness > i64::MAX as u64 {
            bail!("filing.reconcile_freshness_bound_ms out of range: {freshness}");
        }

        let max_attempts = read_u64_at(cfg, "/filing/max_attempts", 5)?;
        if !(1..=20).contains(&max_attempts) {
            bail!("filing.max_attempts out of bounds (1..=20): {max_attempts}");
        }

        let catalog_version_pin = cfg
            .pointer("/rules/catalog_version")
            .and_then(Value::as_str)
            .context("config missing rules.catalog_version")?
            .to_string();

        Ok(Self {
            authority_base_url,
            authority_api_key_env,
            submit_timeout_ms,
            reconcile_freshness_bound_ms: freshness as i64,
            max_filing_attempts: max_attempts as u32,
            catalog_version_pin,
        })
    }

    /// Compare the config pin against the catalog this binary compiled in.
    /// A mismatch means the operator expects different determination rules
    /// than this build ships; refuse to run.
    pub fn ensure_catalog_pin(&self, compiled_version: &str) -> Result<()> {
        if self.catalog_version_pin != compiled_version {
            bail!(
                "CONFIG_CATALOG_PIN_MISMATCH: config pins rule catalog '{}' but this build ships '{}'",
                self.catalog_version_pin,
                compiled_version,
            );
        }
        Ok(())
    }

    /// Resolve the authority API key from the environment, if a key env var
    /// NAME is configured. Unset and blank behave the same. The value never
    /// appears in errors or logs; callers report the NAME only.
    pub fn resolve_authority_api_key(&self) -> Option<String> {
        let name = self.authority_api_key_env.as_deref()?;
        match std::env::var(name) {
            Ok(v) if !v.trim().is_empty() => Some(v),
            _ => None,
        }
    }
}

/// Absent and null fall back to the default. Anything present must be a
/// non-negative integer.
fn read_u64_at(cfg: &Value, pointer: &str, default: u64) -> Result<u64> {
    match cfg.pointer(pointer) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(n)) => n
            .as_u64()
            .with_context(|| format!("config {pointer} must be a non-negative integer")),
        Some(other) => bail!("config {pointer} must be a number, got: {other}"),
    }
}
