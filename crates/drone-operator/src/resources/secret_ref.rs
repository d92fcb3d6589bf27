//! Projection of secret references into container environment variables.
//!
//! Secret values are never read here: the kubelet resolves `secretKeyRef`
//! when the pod starts. A reference to a missing secret or key surfaces as a
//! pod start failure, not as a reconcile error.

use k8s_openapi::api::core::v1::{EnvVar, EnvVarSource, SecretKeySelector};

use crate::crds::SecretRef;

/// Env var sourced from the secret and key named by `secret_ref`.
pub fn secret_env(env_name: &str, secret_ref: &SecretRef) -> EnvVar {
    secret_env_with_key(env_name, &secret_ref.name, &secret_ref.key)
}

/// Env var sourced from an explicit secret name and key.
pub fn secret_env_with_key(env_name: &str, secret_name: &str, key: &str) -> EnvVar {
    EnvVar {
        name: env_name.into(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: Some(secret_name.into()),
                key: key.into(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Plain literal env var.
pub fn plain_env(env_name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: env_name.into(),
        value: Some(value.into()),
        ..Default::default()
    }
}

/// Whether an env var takes its value from a secret.
pub fn is_secret_sourced(env: &EnvVar) -> bool {
    env.value_from
        .as_ref()
        .and_then(|src| src.secret_key_ref.as_ref())
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_env_projects_reference() {
        let env = secret_env("DRONE_GITHUB_CLIENT_ID", &SecretRef::new("gh", "id"));
        assert_eq!(env.name, "DRONE_GITHUB_CLIENT_ID");
        assert!(env.value.is_none());
        let selector = env.value_from.unwrap().secret_key_ref.unwrap();
        assert_eq!(selector.name.as_deref(), Some("gh"));
        assert_eq!(selector.key, "id");
        assert!(selector.optional.is_none());
    }

    #[test]
    fn test_malformed_reference_passes_through() {
        let env = secret_env("X", &SecretRef::new("", "not a key!"));
        let selector = env.value_from.unwrap().secret_key_ref.unwrap();
        assert_eq!(selector.name.as_deref(), Some(""));
        assert_eq!(selector.key, "not a key!");
    }

    #[test]
    fn test_is_secret_sourced() {
        assert!(is_secret_sourced(&secret_env_with_key("A", "s", "k")));
        assert!(!is_secret_sourced(&plain_env("B", "v")));
    }
}
