//! Reverse-proxy fragment
//!
//! A site block binding the operator's domain to the application's local
//! port. The security headers and JSON access log are fixed.

use super::RenderSettings;
use crate::error::{ProvisionError, Result};
use std::path::PathBuf;

/// Headers added to every response, in render order
pub const SECURITY_HEADERS: [(&str, &str); 5] = [
    ("Strict-Transport-Security", "max-age=31536000; includeSubDomains"),
    ("X-Content-Type-Options", "nosniff"),
    ("X-Frame-Options", "DENY"),
    ("Referrer-Policy", "strict-origin-when-cross-origin"),
    ("Permissions-Policy", "camera=(), microphone=(), geolocation=()"),
];

/// Normalize an operator-supplied domain, `None` meaning "skip the proxy"
pub fn normalize_domain(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| d.to_ascii_lowercase())
}

/// Reject domains that would break out of the site address
pub fn validate_domain(domain: &str) -> Result<()> {
    let valid = domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '*' | ':'));
    if valid {
        Ok(())
    } else {
        Err(ProvisionError::InvalidDomain {
            domain: domain.to_string(),
        })
    }
}

/// Access log file for a domain
pub fn access_log_path(settings: &RenderSettings, domain: &str) -> PathBuf {
    settings
        .proxy_log_dir
        .join(format!("{}.access.log", domain.replace('*', "_")))
}

/// Render the site block for `domain`
pub fn render(settings: &RenderSettings, domain: &str) -> Result<String> {
    validate_domain(domain)?;

    let mut out = String::new();
    out.push_str(&format!("# Reverse proxy for {}, generated by provision.\n", domain));
    out.push_str(&format!("{} {{\n", domain));
    out.push_str("\tencode gzip zstd\n");
    out.push_str(&format!("\treverse_proxy localhost:{}\n\n", settings.app_port));

    out.push_str("\theader {\n");
    for (name, value) in SECURITY_HEADERS {
        out.push_str(&format!("\t\t{} \"{}\"\n", name, value));
    }
    out.push_str("\t\t-Server\n");
    out.push_str("\t}\n\n");

    out.push_str("\tlog {\n");
    out.push_str(&format!(
        "\t\toutput file {}\n",
        access_log_path(settings, domain).display()
    ));
    out.push_str("\t\tformat json\n");
    out.push_str("\t}\n");
    out.push_str("}\n");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain(None), None);
        assert_eq!(normalize_domain(Some("")), None);
        assert_eq!(normalize_domain(Some("  ")), None);
        assert_eq!(
            normalize_domain(Some(" Shop.Acme.IO ")),
            Some("shop.acme.io".to_string())
        );
    }

    #[test]
    fn test_render_site_block() {
        let settings = RenderSettings::default();
        let content = render(&settings, "shop.acme.io").unwrap();

        assert!(content.contains("shop.acme.io {\n"));
        assert!(content.contains("reverse_proxy localhost:3000\n"));
        assert!(content.contains("X-Frame-Options \"DENY\""));
        assert!(content.contains("output file /var/log/caddy/shop.acme.io.access.log\n"));
        assert!(content.contains("format json\n"));
        assert_eq!(content.matches('{').count(), content.matches('}').count());
    }

    #[test]
    fn test_render_rejects_injection() {
        let settings = RenderSettings::default();
        assert!(render(&settings, "evil.io {\n}\n:80").is_err());
        let err = render(&settings, "a b").unwrap_err();
        assert!(matches!(err, ProvisionError::InvalidDomain { .. }));
        assert!(err.is_input_error());
        assert!(validate_domain("*.shop.acme.io").is_ok());
    }
}
