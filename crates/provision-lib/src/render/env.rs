//! Environment/secrets fragment

use super::RenderSettings;
use rand::distr::Alphanumeric;
use rand::Rng;

/// Key holding the generated database credential
pub const CREDENTIAL_KEY: &str = "POSTGRES_PASSWORD";

/// Length of generated credentials
pub const CREDENTIAL_LENGTH: usize = 40;

/// Generate a fresh alphanumeric credential
///
/// Alphanumerics only, so the value survives shell quoting, URL embedding and
/// dotenv parsing unescaped.
pub fn generate_credential() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(CREDENTIAL_LENGTH)
        .map(char::from)
        .collect()
}

/// Render the env fragment around a credential
pub fn render(settings: &RenderSettings, credential: &str, generated_at: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Generated by provision at {}\n", generated_at));
    out.push_str("# Holds credentials: keep this file readable by its owner only.\n");
    out.push_str("# It is never regenerated; delete it to rotate the credential.\n");
    out.push_str(&format!("POSTGRES_USER={}\n", settings.db_user));
    out.push_str(&format!("POSTGRES_DB={}\n", settings.db_name));
    out.push_str(&format!("{}={}\n", CREDENTIAL_KEY, credential));
    out.push_str(&format!("APP_PORT={}\n", settings.app_port));
    out.push_str(&format!(
        "DATABASE_URL=postgres://{}:{}@{}:5432/{}\n",
        settings.db_user, credential, settings.database_service, settings.db_name
    ));
    out
}

/// Read the credential back from an existing env fragment
///
/// Tolerates `export` prefixes, surrounding quotes and whitespace.
pub fn read_credential(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let line = line.trim();
        let line = line.strip_prefix("export ").unwrap_or(line);
        let (key, value) = line.split_once('=')?;
        if key.trim() != CREDENTIAL_KEY {
            return None;
        }
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        (!value.is_empty()).then(|| value.to_string())
    })
}
