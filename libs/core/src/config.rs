//! Provider configuration, loaded once at startup from the environment.
//!
//! A provider whose required credentials are absent starts in disabled mode:
//! its registry answers registrations with a diagnostic and ignores
//! everything else. Missing configuration never aborts the process.

use std::time::Duration;

pub const DEFAULT_FCM_API_BASE: &str = "https://fcm.googleapis.com";
pub const DEFAULT_VAPID_SUBJECT: &str = "mailto:admin@example.com";

const DEFAULT_RETRY_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_WEBPUSH_TTL_SECS: u32 = 86_400;

/// Firebase Cloud Messaging credentials and tuning.
#[derive(Debug, Clone)]
pub struct FcmConfig {
    pub project_id: Option<String>,
    pub application_id: Option<String>,
    pub api_key: Option<String>,
    pub server_key: Option<String>,
    pub proxy: Option<String>,
    pub api_base: String,
    pub retry_timeout: Duration,
}

impl Default for FcmConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            application_id: None,
            api_key: None,
            server_key: None,
            proxy: None,
            api_base: DEFAULT_FCM_API_BASE.to_string(),
            retry_timeout: DEFAULT_RETRY_TIMEOUT,
        }
    }
}

impl FcmConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(&env_lookup)
    }

    /// All four credential fields are required for the provider to start.
    pub fn is_configured(&self) -> bool {
        self.project_id.is_some()
            && self.application_id.is_some()
            && self.api_key.is_some()
            && self.server_key.is_some()
    }

    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            project_id: lookup("FCM_PROJECT_ID"),
            application_id: lookup("FCM_APPLICATION_ID"),
            api_key: lookup("FCM_API_KEY"),
            server_key: lookup("FCM_SERVER_KEY"),
            proxy: lookup("FCM_PROXY"),
            api_base: lookup("FCM_API_BASE").unwrap_or(defaults.api_base),
            retry_timeout: millis(lookup("FCM_RETRY_TIMEOUT_MS"), defaults.retry_timeout),
        }
    }
}

/// VAPID key pair (base64url; the private key is the raw P-256 scalar).
#[derive(Debug, Clone)]
pub struct VapidKeys {
    pub public_key: String,
    pub private_key: String,
}

/// Web Push credentials and tuning.
#[derive(Debug, Clone)]
pub struct WebPushConfig {
    pub api_key: Option<String>,
    pub vapid: Option<VapidKeys>,
    /// VAPID `sub` claim presented to push services.
    pub subject: String,
    /// Seconds the push service may hold an undelivered notification.
    pub ttl: u32,
    pub proxy: Option<String>,
    pub retry_timeout: Duration,
}

impl Default for WebPushConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            vapid: None,
            subject: DEFAULT_VAPID_SUBJECT.to_string(),
            ttl: DEFAULT_WEBPUSH_TTL_SECS,
            proxy: None,
            retry_timeout: DEFAULT_RETRY_TIMEOUT,
        }
    }
}

impl WebPushConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(&env_lookup)
    }

    /// The API key and both VAPID keys are required for the provider to start.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.vapid.is_some()
    }

    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let vapid = match (
            lookup("WEBPUSH_VAPID_PUBLIC_KEY"),
            lookup("WEBPUSH_VAPID_PRIVATE_KEY"),
        ) {
            (Some(public_key), Some(private_key)) => Some(VapidKeys {
                public_key,
                private_key,
            }),
            _ => None,
        };
        Self {
            api_key: lookup("WEBPUSH_API_KEY"),
            vapid,
            subject: lookup("WEBPUSH_VAPID_SUBJECT").unwrap_or(defaults.subject),
            ttl: lookup("WEBPUSH_TTL_SECS")
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(defaults.ttl),
            proxy: lookup("WEBPUSH_PROXY"),
            retry_timeout: millis(lookup("WEBPUSH_RETRY_TIMEOUT_MS"), defaults.retry_timeout),
        }
    }
}

/// Configuration for every push provider.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub fcm: FcmConfig,
    pub webpush: WebPushConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            fcm: FcmConfig::from_env(),
            webpush: WebPushConfig::from_env(),
        }
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn millis(raw: Option<String>, default: Duration) -> Duration {
    raw.and_then(|value| value.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn fcm_requires_all_four_credentials() {
        let partial = FcmConfig {
            project_id: Some("p".into()),
            application_id: Some("a".into()),
            api_key: Some("k".into()),
            ..Default::default()
        };
        assert!(!partial.is_configured());

        let full = FcmConfig {
            server_key: Some("s".into()),
            ..partial
        };
        assert!(full.is_configured());
    }

    #[test]
    fn fcm_from_lookup_reads_overrides() {
        let env = lookup(&[
            ("FCM_PROJECT_ID", "proj"),
            ("FCM_APPLICATION_ID", "app"),
            ("FCM_API_KEY", "api"),
            ("FCM_SERVER_KEY", "server"),
            ("FCM_API_BASE", "http://127.0.0.1:9/"),
            ("FCM_RETRY_TIMEOUT_MS", "250"),
        ]);
        let config = FcmConfig::from_lookup(&env);
        assert!(config.is_configured());
        assert_eq!(config.api_base, "http://127.0.0.1:9/");
        assert_eq!(config.retry_timeout, Duration::from_millis(250));
        assert!(config.proxy.is_none());
    }

    #[test]
    fn webpush_requires_api_key_and_both_vapid_keys() {
        let missing_private = WebPushConfig::from_lookup(&lookup(&[
            ("WEBPUSH_API_KEY", "key"),
            ("WEBPUSH_VAPID_PUBLIC_KEY", "pub"),
        ]));
        assert!(!missing_private.is_configured());
        assert!(missing_private.vapid.is_none());

        let full = WebPushConfig::from_lookup(&lookup(&[
            ("WEBPUSH_API_KEY", "key"),
            ("WEBPUSH_VAPID_PUBLIC_KEY", "pub"),
            ("WEBPUSH_VAPID_PRIVATE_KEY", "priv"),
        ]));
        assert!(full.is_configured());
        assert_eq!(full.subject, DEFAULT_VAPID_SUBJECT);
        assert_eq!(full.ttl, 86_400);
    }
}
