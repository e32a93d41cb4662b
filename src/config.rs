use std::env;
use std::fs;
use std::path::Path;

use lettre::message::Mailbox;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::templates::TemplateRegistry;

pub const CONFIG_PATH: &str = "config.toml";

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub debug: Option<bool>, // Enable debug output
    pub mail: MailConfig,
    pub drive: DriveConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MailConfig {
    /// Sender mailbox, either `addr@host` or `Display Name <addr@host>`.
    pub sender: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub server: String,
    pub port: u16,
    #[serde(alias = "recepient_list")]
    pub recipient_list: Vec<String>,
    /// Language of the email body and subject. Logging is unaffected.
    pub lang: String,
    #[serde(default)]
    pub security: SmtpSecurity,
    pub enabled: Option<bool>, // false: render and print instead of sending
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    #[default]
    None,
    Starttls,
    Ssl,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DriveConfig {
    /// Mount point, directory or drive letter to check.
    pub path: String,
    pub limit_bytes: u64,
}

impl MailConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn uses_auth(&self) -> bool {
        !(self.username.trim().is_empty() && self.password.trim().is_empty())
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let (config, warnings) = load_config_with(path.as_ref(), |key| env::var(key).ok())?;
    if !warnings.is_empty() {
        eprintln!("[CONFIG WARNING] {}", warnings.join(" | "));
    }
    Ok(config)
}

/// Read, apply environment overrides, then validate what will actually be used.
fn load_config_with<F>(path: &Path, lookup: F) -> Result<(Config, Vec<String>), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    // Credentials live in this file
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = fs::metadata(path) {
            let mode = metadata.permissions().mode();
            if mode & 0o044 != 0 {
                eprintln!(
                    "[SECURITY WARNING] Configuration file {} has overly permissive permissions (readable by group/others). Consider: chmod 600 {}",
                    path.display(),
                    path.display()
                );
            }
        }
    }

    let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let config = apply_env_overrides(parse_config(path, &data)?, lookup);
    let warnings = validate_config(&config)?;

    Ok((config, warnings))
}

/// YAML for `.yaml`/`.yml` files, TOML for everything else.
fn parse_config(path: &Path, data: &str) -> Result<Config, ConfigError> {
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    if is_yaml {
        serde_yaml::from_str(data).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    } else {
        toml::from_str(data).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(user) = lookup("HDDWATCHER_SMTP_USER") {
        if !user.trim().is_empty() {
            config.mail.username = user;
        }
    }

    if let Some(pass) = lookup("HDDWATCHER_SMTP_PASS") {
        if !pass.trim().is_empty() {
            config.mail.password = pass;
        }
    }

    config
}

/// Returns the non-fatal warnings when the configuration is usable.
pub fn validate_config(config: &Config) -> Result<Vec<String>, ConfigError> {
    let mut missing_keys = Vec::new();
    let mut warnings = Vec::new();
    let mail = &config.mail;

    if mail.server.trim().is_empty() {
        missing_keys.push("mail.server".to_string());
    }
    if mail.port == 0 {
        missing_keys.push("mail.port (must be 1-65535)".to_string());
    }
    if mail.sender.parse::<Mailbox>().is_err() {
        missing_keys.push("mail.sender (must be a valid mailbox)".to_string());
    }

    let recipients: Vec<&str> = mail
        .recipient_list
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .collect();
    if recipients.is_empty() {
        missing_keys.push("mail.recipient_list (must name at least one address)".to_string());
    }
    for addr in &recipients {
        if addr.parse::<Mailbox>().is_err() {
            missing_keys.push(format!("mail.recipient_list ('{addr}' is not a valid address)"));
        }
    }

    if mail.lang.trim().is_empty() {
        missing_keys.push("mail.lang".to_string());
    }
    if config.drive.path.trim().is_empty() {
        missing_keys.push("drive.path".to_string());
    }

    if mail.security == SmtpSecurity::None && mail.uses_auth() {
        warnings.push("SMTP security is 'none'; credentials are sent unencrypted.".to_string());
    }
    if config.debug.unwrap_or(false) {
        warnings.push("Debug mode is enabled. This may expose sensitive information in logs.".to_string());
    }
    if !mail.is_enabled() {
        warnings.push("mail.enabled is false. Notifications are printed, not sent.".to_string());
    }

    if !missing_keys.is_empty() {
        return Err(ConfigError::Invalid(missing_keys.join(", ")));
    }
    Ok(warnings)
}

/// The configured language must have a template and a non-empty subject.
pub fn validate_language(config: &Config, registry: &TemplateRegistry) -> Result<(), ConfigError> {
    let supported = registry.supported_languages();
    let lang = config.mail.lang.as_str();
    if !supported.contains(lang) {
        return Err(ConfigError::UnsupportedLanguage {
            language: lang.to_string(),
            supported: supported.into_iter().collect::<Vec<_>>().join(", "),
        });
    }
    match registry.subject_for(lang) {
        Some(subject) if !subject.trim().is_empty() => Ok(()),
        _ => Err(ConfigError::MissingSubject(lang.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TOML_CONFIG: &str = r#"
debug = false

[mail]
sender = "Disk Watcher <watcher@example.com>"
username = "watcher"
password = "secret"
server = "smtp.example.com"
port = 587
recipient_list = ["ops@example.com", "oncall@example.com"]
lang = "en"
security = "starttls"

[drive]
path = "/var"
limit_bytes = 10000000000
"#;

    fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn parsed() -> Config {
        toml::from_str(TOML_CONFIG).unwrap()
    }

    #[test]
    fn loads_toml_config() {
        let file = write_config(".toml", TOML_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.mail.server, "smtp.example.com");
        assert_eq!(config.mail.port, 587);
        assert_eq!(config.mail.recipient_list.len(), 2);
        assert_eq!(config.mail.security, SmtpSecurity::Starttls);
        assert!(config.mail.is_enabled());
        assert_eq!(config.drive.path, "/var");
        assert_eq!(config.drive.limit_bytes, 10_000_000_000);
    }

    #[test]
    fn loads_yaml_config() {
        let yaml = r#"
mail:
  sender: watcher@example.com
  server: localhost
  port: 25
  recipient_list: [ops@example.com]
  lang: bg
  enabled: false
drive:
  path: /
  limit_bytes: 1024
"#;
        let file = write_config(".yml", yaml);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.mail.lang, "bg");
        assert_eq!(config.mail.security, SmtpSecurity::None);
        assert!(!config.mail.is_enabled());
        assert!(!config.mail.uses_auth());
        assert_eq!(config.drive.limit_bytes, 1024);
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_config("/nonexistent/hddwatcher.toml").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let file = write_config(".toml", "[mail\nsender = ");
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }

    #[test]
    fn every_invalid_key_is_listed() {
        let mut config = parsed();
        config.mail.server = " ".to_string();
        config.mail.port = 0;
        config.mail.recipient_list = vec!["".to_string()];
        config.drive.path = String::new();

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("mail.server"));
        assert!(err.contains("mail.port"));
        assert!(err.contains("mail.recipient_list"));
        assert!(err.contains("drive.path"));
    }

    #[test]
    fn bad_recipient_is_named() {
        let mut config = parsed();
        config.mail.recipient_list.push("not-an-address".to_string());
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("not-an-address"));
    }

    #[test]
    fn env_overrides_replace_credentials() {
        let config = apply_env_overrides(parsed(), |key| match key {
            "HDDWATCHER_SMTP_USER" => Some("from-env".to_string()),
            "HDDWATCHER_SMTP_PASS" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.mail.username, "from-env");
        assert_eq!(config.mail.password, "secret");
    }

    #[test]
    fn credentials_from_env_are_validated() {
        let toml = r#"
[mail]
sender = "watcher@example.com"
server = "smtp.example.com"
port = 25
recipient_list = ["ops@example.com"]
lang = "en"

[drive]
path = "/"
limit_bytes = 1
"#;
        let file = write_config(".toml", toml);

        let (config, warnings) = load_config_with(file.path(), |_| None).unwrap();
        assert!(!config.mail.uses_auth());
        assert!(!warnings.iter().any(|w| w.contains("unencrypted")));

        let (config, warnings) = load_config_with(file.path(), |key| match key {
            "HDDWATCHER_SMTP_USER" => Some("watcher".to_string()),
            "HDDWATCHER_SMTP_PASS" => Some("secret".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.mail.username, "watcher");
        assert!(warnings.iter().any(|w| w.contains("unencrypted")));
    }

    #[test]
    fn legacy_recipient_key_is_accepted() {
        let toml = r#"
[mail]
sender = "watcher@example.com"
server = "smtp.example.com"
port = 25
recepient_list = ["ops@example.com", "oncall@example.com"]
lang = "bg"

[drive]
path = "/"
limit_bytes = 1
"#;
        let file = write_config(".toml", toml);
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.mail.recipient_list, vec!["ops@example.com", "oncall@example.com"]);
    }

    #[test]
    fn language_must_have_a_template() {
        let registry = TemplateRegistry::builtin().unwrap();
        let mut config = parsed();
        assert!(validate_language(&config, &registry).is_ok());

        config.mail.lang = "xx".to_string();
        let err = validate_language(&config, &registry).unwrap_err();
        match err {
            ConfigError::UnsupportedLanguage { language, supported } => {
                assert_eq!(language, "xx");
                assert!(supported.contains("en"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn language_must_have_a_subject() {
        let registry =
            TemplateRegistry::from_sources([("de", "<p>{{ hostname }}</p>")], r#"{"en": "Low disk space"}"#)
                .unwrap();
        let mut config = parsed();
        config.mail.lang = "de".to_string();
        let err = validate_language(&config, &registry).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSubject(ref l) if l == "de"));
    }
}
