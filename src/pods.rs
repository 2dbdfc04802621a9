use k8s_openapi::api::core::v1::Pod;
use kube::{Api, Client, api::ListParams};
use tracing::debug;

use crate::error::ApiCallError;

/// Counts pods in `namespace`, or across the cluster when it is empty.
pub async fn list_pods(client: &Client, namespace: &str) -> Result<usize, ApiCallError> {
    let pods: Api<Pod> = if namespace.is_empty() {
        Api::all(client.clone())
    } else {
        Api::namespaced(client.clone(), namespace)
    };

    let list = pods
        .list(&ListParams::default())
        .await
        .map_err(|e| classify(e, namespace, ""))?;
    debug!("Listed {} pods", list.items.len());
    Ok(list.items.len())
}

pub async fn get_pod(client: &Client, namespace: &str, name: &str) -> Result<Pod, ApiCallError> {
    let pods: Api<Pod> = Api::namespaced(client.clone(), namespace);
    pods.get(name)
        .await
        .map_err(|e| classify(e, namespace, name))
}

fn classify(err: kube::Error, namespace: &str, name: &str) -> ApiCallError {
    match err {
        kube::Error::Api(response) if response.code == 404 => ApiCallError::NotFound {
            namespace: namespace.to_string(),
            name: name.to_string(),
        },
        kube::Error::Api(response) => ApiCallError::Other {
            message: response.message,
        },
        other => ApiCallError::Other {
            message: other.to_string(),
        },
    }
}
