use std::time::Duration;

use crate::error::ConfigError;

pub const CLUSTER_VAR: &str = "cluster";
pub const ROLE_VAR: &str = "role";
pub const REGION_VAR: &str = "region";
pub const AMBIENT_REGION_VARS: [&str; 2] = ["AWS_REGION", "AWS_DEFAULT_REGION"];
pub const NAMESPACE_VAR: &str = "namespace";
pub const POD_NAMESPACE_VAR: &str = "pod_namespace";
pub const POD_VAR: &str = "pod";

const DEFAULT_POD_NAMESPACE: &str = "default";
const DEFAULT_POD: &str = "example-xxxxx";

/// Upper bound for every outbound call made during an invocation.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Everything an invocation needs before the first network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    cluster_name: String,
    role_arn: String,
    region: String,
    namespace: String,
    pod_namespace: String,
    pod_name: String,
}

impl Settings {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // empty values count as unset
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let cluster_name = get(CLUSTER_VAR).ok_or(ConfigError::Missing { var: CLUSTER_VAR })?;

        // the role must be present, but an empty value means "use own identity"
        let role_arn = lookup(ROLE_VAR).ok_or(ConfigError::Missing { var: ROLE_VAR })?;

        let region = resolve_region(&get)?;

        Ok(Settings {
            cluster_name,
            role_arn,
            region,
            namespace: get(NAMESPACE_VAR).unwrap_or_default(),
            pod_namespace: get(POD_NAMESPACE_VAR)
                .unwrap_or_else(|| DEFAULT_POD_NAMESPACE.to_string()),
            pod_name: get(POD_VAR).unwrap_or_else(|| DEFAULT_POD.to_string()),
        })
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    pub fn role_arn(&self) -> &str {
        &self.role_arn
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Namespace to count pods in, empty for all namespaces.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn pod_namespace(&self) -> &str {
        &self.pod_namespace
    }

    pub fn pod_name(&self) -> &str {
        &self.pod_name
    }
}

/// Explicit `region` first, then the platform's ambient variables in order.
fn resolve_region<F>(get: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    std::iter::once(REGION_VAR)
        .chain(AMBIENT_REGION_VARS)
        .find_map(get)
        .ok_or_else(|| ConfigError::MissingRegion {
            vars: std::iter::once(REGION_VAR)
                .chain(AMBIENT_REGION_VARS)
                .collect(),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| env.get(key).cloned()
    }

    #[test]
    fn reads_required_values_and_defaults() {
        let settings = Settings::from_lookup(lookup(&[
            ("cluster", "demo"),
            ("role", "arn:aws:iam::123456789012:role/KubernetesAdmin"),
            ("AWS_REGION", "us-west-2"),
        ]))
        .unwrap();

        assert_eq!(settings.cluster_name(), "demo");
        assert_eq!(
            settings.role_arn(),
            "arn:aws:iam::123456789012:role/KubernetesAdmin"
        );
        assert_eq!(settings.region(), "us-west-2");
        assert_eq!(settings.namespace(), "");
        assert_eq!(settings.pod_namespace(), "default");
        assert_eq!(settings.pod_name(), "example-xxxxx");
    }

    #[test]
    fn missing_cluster_is_fatal() {
        let err =
            Settings::from_lookup(lookup(&[("role", ""), ("region", "us-west-2")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing { var: "cluster" });
    }

    #[test]
    fn empty_cluster_counts_as_missing() {
        let err = Settings::from_lookup(lookup(&[
            ("cluster", ""),
            ("role", ""),
            ("region", "us-west-2"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing { var: "cluster" });
    }

    #[test]
    fn missing_role_is_fatal_but_empty_role_is_allowed() {
        let err = Settings::from_lookup(lookup(&[("cluster", "demo"), ("region", "us-west-2")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::Missing { var: "role" });

        let settings = Settings::from_lookup(lookup(&[
            ("cluster", "demo"),
            ("role", ""),
            ("region", "us-west-2"),
        ]))
        .unwrap();
        assert_eq!(settings.role_arn(), "");
    }

    #[test]
    fn explicit_region_wins_over_ambient() {
        let settings = Settings::from_lookup(lookup(&[
            ("cluster", "demo"),
            ("role", ""),
            ("region", "eu-central-1"),
            ("AWS_REGION", "us-west-2"),
            ("AWS_DEFAULT_REGION", "us-east-1"),
        ]))
        .unwrap();
        assert_eq!(settings.region(), "eu-central-1");
    }

    #[test]
    fn ambient_region_order() {
        let settings = Settings::from_lookup(lookup(&[
            ("cluster", "demo"),
            ("role", ""),
            ("region", ""),
            ("AWS_REGION", "us-west-2"),
            ("AWS_DEFAULT_REGION", "us-east-1"),
        ]))
        .unwrap();
        assert_eq!(settings.region(), "us-west-2");

        let settings = Settings::from_lookup(lookup(&[
            ("cluster", "demo"),
            ("role", ""),
            ("AWS_DEFAULT_REGION", "us-east-1"),
        ]))
        .unwrap();
        assert_eq!(settings.region(), "us-east-1");
    }

    #[test]
    fn no_region_anywhere_is_fatal() {
        let err = Settings::from_lookup(lookup(&[("cluster", "demo"), ("role", "")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingRegion {
                vars: vec!["region", "AWS_REGION", "AWS_DEFAULT_REGION"]
            }
        );
        assert!(err.to_string().contains("AWS_REGION"));
    }

    #[test]
    fn pod_lookup_target_is_configurable() {
        let settings = Settings::from_lookup(lookup(&[
            ("cluster", "demo"),
            ("role", ""),
            ("region", "us-west-2"),
            ("namespace", "kube-system"),
            ("pod_namespace", "apps"),
            ("pod", "web-0"),
        ]))
        .unwrap();
        assert_eq!(settings.namespace(), "kube-system");
        assert_eq!(settings.pod_namespace(), "apps");
        assert_eq!(settings.pod_name(), "web-0");
    }
}
