// ABOUTME: Resolves the app config for a deploy: local file first, platform copy otherwise.
// ABOUTME: Applies --env overrides on top of whichever config was chosen.

use super::{Config, Definition, parse_kv_pairs};
use crate::api::ApiError;
use crate::error::{Error, Result};
use crate::types::AppName;
use async_trait::async_trait;

/// Where the platform's copy of an app config comes from.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn fetch_config(&self, app: &AppName) -> std::result::Result<Definition, ApiError>;
}

/// Pick the local config if present, else fetch the deployed one, then apply `env` (`NAME=VALUE`).
pub async fn determine_app_config<S>(
    local: Option<Config>,
    source: &S,
    app: &AppName,
    env: &[String],
) -> Result<Config>
where
    S: ConfigSource + ?Sized,
{
    let mut config = match local {
        Some(config) => config,
        None => {
            tracing::debug!("no local app config detected; fetching from backend");
            let definition = source
                .fetch_config(app)
                .await
                .map_err(Error::ConfigFetchFailed)?;
            Config::from_definition(definition)?
        }
    };

    if !env.is_empty() {
        config.set_env(parse_kv_pairs(env)?);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSource {
        definition: Option<Definition>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn returning(value: serde_json::Value) -> Self {
            let definition = serde_json::from_value(value).unwrap();
            Self {
                definition: Some(definition),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                definition: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ConfigSource for FakeSource {
        async fn fetch_config(
            &self,
            app: &AppName,
        ) -> std::result::Result<Definition, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.definition.clone().ok_or_else(|| ApiError::Status {
                status: 404,
                message: format!("app {app} not found"),
            })
        }
    }

    fn app() -> AppName {
        AppName::new("web").unwrap()
    }

    #[tokio::test]
    async fn local_config_skips_the_platform() {
        let source = FakeSource::failing();
        let local = Config::from_yaml("app: web\nenv:\n  A: '1'\n").unwrap();

        let config = determine_app_config(Some(local), &source, &app(), &[])
            .await
            .unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(config.env["A"], "1");
    }

    #[tokio::test]
    async fn missing_local_config_is_fetched() {
        let source = FakeSource::returning(json!({
            "app": "web",
            "build": { "image": "nginx:1.27" }
        }));

        let config = determine_app_config(None, &source, &app(), &[])
            .await
            .unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(config.build_image(), Some("nginx:1.27"));
        assert!(config.path.is_none());
    }

    #[tokio::test]
    async fn fetch_failure_is_reported_as_config_fetch_failed() {
        let err = determine_app_config(None, &FakeSource::failing(), &app(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConfigFetchFailed(_)));
    }

    #[tokio::test]
    async fn env_overrides_reach_the_definition() {
        let local = Config::from_yaml("env:\n  LOG: info\n").unwrap();
        let env = vec!["LOG=debug".to_string(), "NEW=1".to_string()];

        let config = determine_app_config(Some(local), &FakeSource::failing(), &app(), &env)
            .await
            .unwrap();

        assert_eq!(config.env["LOG"], "debug");
        assert_eq!(config.definition.get("env").unwrap()["NEW"], "1");
    }

    #[tokio::test]
    async fn malformed_env_is_rejected() {
        let env = vec!["LOG".to_string()];
        let err = determine_app_config(
            Some(Config::from_yaml("{}").unwrap()),
            &FakeSource::failing(),
            &app(),
            &env,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidKeyValue(_)));
    }
}
