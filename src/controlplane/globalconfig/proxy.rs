//! Derivation of the cluster proxy status.
//!
//! The no-proxy list mirrors what the cluster network operator computes inside the guest
//! cluster. It is needed before that operator runs, and consumers parse the resulting
//! string, so membership rules must not drift from the network operator's.

use std::collections::BTreeSet;

use super::GlobalConfig;
use crate::crd::hostedcluster::HostedCluster;
use crate::crd::hostedcontrolplane::HostedControlPlane;
use crate::crd::platform::{PlatformSpec, PlatformType};
use crate::crd::proxy::{Proxy, ProxySpec, ProxyStatus};
use crate::errors::Error;

const METADATA_ENDPOINT: &str = "169.254.169.254";

/// AWS regions whose internal DNS suffix does not follow `.<region>.compute.internal`.
/// A region missing here gets the templated suffix.
const AWS_REGION_DNS_SUFFIXES: &[(&str, &str)] = &[("us-east-1", ".ec2.internal")];

pub fn aws_internal_dns_suffix(region: &str) -> String {
    AWS_REGION_DNS_SUFFIXES
        .iter()
        .find(|(special, _)| *special == region)
        .map(|(_, suffix)| suffix.to_string())
        .unwrap_or_else(|| format!(".{region}.compute.internal"))
}

pub fn reconcile_proxy_config(proxy: &mut Proxy, global_config: &GlobalConfig) {
    proxy.spec = global_config
        .proxy
        .as_ref()
        .map(|p| p.spec.clone())
        .unwrap_or_default();
}

pub fn reconcile_proxy_config_with_status(
    proxy: &mut Proxy,
    hcp: &HostedControlPlane,
    global_config: &GlobalConfig,
) -> Result<(), Error> {
    reconcile_proxy_config(proxy, global_config);
    default_proxy_status(
        proxy,
        &hcp.spec.machine_cidr,
        &hcp.spec.pod_cidr,
        &hcp.spec.service_cidr,
        &hcp.spec.platform,
    )
}

pub fn reconcile_proxy_config_with_status_from_hosted_cluster(
    proxy: &mut Proxy,
    hc: &HostedCluster,
    global_config: &GlobalConfig,
) -> Result<(), Error> {
    reconcile_proxy_config(proxy, global_config);
    let networking = &hc.spec.networking;
    default_proxy_status(
        proxy,
        &networking.machine_cidr,
        &networking.pod_cidr,
        &networking.service_cidr,
        &hc.spec.platform,
    )
}

/// Fill in the proxy status from its spec and the cluster's network facts.
///
/// Status is replaced as a whole. Without any proxy URL the no-proxy list stays empty.
pub fn default_proxy_status(
    proxy: &mut Proxy,
    machine_cidr: &str,
    pod_cidr: &str,
    service_cidr: &str,
    platform: &PlatformSpec,
) -> Result<(), Error> {
    let mut status = ProxyStatus {
        http_proxy: proxy.spec.http_proxy.clone(),
        https_proxy: proxy.spec.https_proxy.clone(),
        no_proxy: String::new(),
    };

    if !status.http_proxy.is_empty() || !status.https_proxy.is_empty() {
        status.no_proxy =
            no_proxy(&proxy.spec, machine_cidr, pod_cidr, service_cidr, platform)?;
    }

    proxy.status = Some(status);
    Ok(())
}

/// Sorted, comma-joined set of destinations that bypass the proxy
pub fn no_proxy(
    spec: &ProxySpec,
    machine_cidr: &str,
    pod_cidr: &str,
    service_cidr: &str,
    platform: &PlatformSpec,
) -> Result<String, Error> {
    let mut set: BTreeSet<String> = [
        "127.0.0.1",
        "localhost",
        ".svc",
        ".cluster.local",
        // private clusters resolve their API endpoints under .local
        ".local",
        pod_cidr,
        service_cidr,
    ]
    .into_iter()
    .map(String::from)
    .collect();

    if !machine_cidr.is_empty() {
        set.insert(machine_cidr.to_string());
    }

    if platform.type_.has_metadata_endpoint() {
        set.insert(METADATA_ENDPOINT.to_string());
    }

    if platform.type_ == PlatformType::Aws {
        set.insert(aws_internal_dns_suffix(platform.aws_region()?));
    }

    set.extend(
        spec.no_proxy
            .split(',')
            .filter(|entry| !entry.is_empty())
            .map(String::from),
    );

    Ok(set.into_iter().collect::<Vec<_>>().join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::hostedcluster::{ClusterConfiguration, ClusterNetworking, HostedClusterSpec};
    use crate::crd::hostedcontrolplane::HostedControlPlaneSpec;
    use crate::crd::platform::{AwsPlatformSpec, AzurePlatformSpec};
    use crate::crd::proxy::proxy_config;
    use proptest::prelude::*;

    const POD_CIDR: &str = "10.128.0.0/14";
    const SERVICE_CIDR: &str = "172.30.0.0/16";
    const MACHINE_CIDR: &str = "10.0.0.0/16";

    fn aws(region: &str) -> PlatformSpec {
        PlatformSpec {
            type_: PlatformType::Aws,
            aws: Some(AwsPlatformSpec {
                region: region.into(),
            }),
            ..Default::default()
        }
    }

    fn proxy(http: &str, https: &str, no_proxy: &str) -> Proxy {
        let mut proxy = proxy_config();
        proxy.spec = ProxySpec {
            http_proxy: http.into(),
            https_proxy: https.into(),
            no_proxy: no_proxy.into(),
            ..Default::default()
        };
        proxy
    }

    fn members(proxy: &Proxy) -> BTreeSet<String> {
        proxy
            .status
            .as_ref()
            .unwrap()
            .no_proxy
            .split(',')
            .map(String::from)
            .collect()
    }

    fn expected(extra: &[&str]) -> BTreeSet<String> {
        [
            "127.0.0.1",
            "localhost",
            ".svc",
            ".cluster.local",
            ".local",
            POD_CIDR,
            SERVICE_CIDR,
        ]
        .iter()
        .chain(extra)
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn aws_us_east_1_uses_ec2_internal() {
        let mut p = proxy("http://proxy:8080", "", "");
        default_proxy_status(&mut p, MACHINE_CIDR, POD_CIDR, SERVICE_CIDR, &aws("us-east-1"))
            .unwrap();
        assert_eq!(
            members(&p),
            expected(&[MACHINE_CIDR, "169.254.169.254", ".ec2.internal"])
        );
    }

    #[test]
    fn aws_other_regions_use_compute_internal() {
        let mut p = proxy("http://proxy:8080", "", "");
        default_proxy_status(&mut p, MACHINE_CIDR, POD_CIDR, SERVICE_CIDR, &aws("eu-west-1"))
            .unwrap();
        assert_eq!(
            members(&p),
            expected(&[MACHINE_CIDR, "169.254.169.254", ".eu-west-1.compute.internal"])
        );
    }

    #[test]
    fn no_proxy_urls_short_circuit() {
        let mut p = proxy("", "", "");
        default_proxy_status(&mut p, MACHINE_CIDR, POD_CIDR, SERVICE_CIDR, &aws("us-east-1"))
            .unwrap();
        assert_eq!(p.status, Some(ProxyStatus::default()));
    }

    #[test]
    fn short_circuit_clears_a_previous_no_proxy() {
        let mut p = proxy("", "", "");
        p.status = Some(ProxyStatus {
            no_proxy: "stale".into(),
            ..Default::default()
        });
        default_proxy_status(&mut p, MACHINE_CIDR, POD_CIDR, SERVICE_CIDR, &aws("us-east-1"))
            .unwrap();
        assert_eq!(p.status, Some(ProxyStatus::default()));
    }

    #[test]
    fn user_entries_are_merged_and_blanks_dropped() {
        let mut p = proxy("", "https://proxy:8443", "example.com,,internal.foo");
        default_proxy_status(&mut p, "", POD_CIDR, SERVICE_CIDR, &PlatformSpec::default()).unwrap();
        assert_eq!(members(&p), expected(&["example.com", "internal.foo"]));
        assert!(!p.status.unwrap().no_proxy.contains(",,"));
    }

    #[test]
    fn azure_gets_metadata_endpoint_only() {
        let platform = PlatformSpec {
            type_: PlatformType::Azure,
            azure: Some(AzurePlatformSpec {
                location: "eastus".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut p = proxy("http://proxy:8080", "", "");
        default_proxy_status(&mut p, "", POD_CIDR, SERVICE_CIDR, &platform).unwrap();
        assert_eq!(members(&p), expected(&["169.254.169.254"]));
    }

    #[test]
    fn status_mirrors_proxy_urls() {
        let mut p = proxy("http://proxy:8080", "https://proxy:8443", "");
        default_proxy_status(&mut p, "", POD_CIDR, SERVICE_CIDR, &PlatformSpec::default()).unwrap();
        let status = p.status.unwrap();
        assert_eq!(status.http_proxy, "http://proxy:8080");
        assert_eq!(status.https_proxy, "https://proxy:8443");
    }

    #[test]
    fn output_is_sorted() {
        let mut p = proxy("http://proxy:8080", "", "zeta.example,alpha.example");
        default_proxy_status(&mut p, MACHINE_CIDR, POD_CIDR, SERVICE_CIDR, &aws("us-east-1"))
            .unwrap();
        let list: Vec<String> = p
            .status
            .unwrap()
            .no_proxy
            .split(',')
            .map(String::from)
            .collect();
        let mut sorted = list.clone();
        sorted.sort();
        assert_eq!(list, sorted);
    }

    #[test]
    fn aws_without_sub_spec_is_an_input_error() {
        let platform = PlatformSpec {
            type_: PlatformType::Aws,
            ..Default::default()
        };
        let mut p = proxy("http://proxy:8080", "", "");
        let err = default_proxy_status(&mut p, "", POD_CIDR, SERVICE_CIDR, &platform).unwrap_err();
        assert!(matches!(err, Error::PlatformMismatch { .. }));
    }

    #[test]
    fn spec_is_taken_from_global_config() {
        let global_config = GlobalConfig::parse(Some(&ClusterConfiguration {
            proxy: Some(proxy("http://proxy:8080", "", "").spec),
        }));
        let mut p = proxy_config();
        p.spec.no_proxy = "leftover".into();
        reconcile_proxy_config(&mut p, &global_config);
        assert_eq!(p.spec.http_proxy, "http://proxy:8080");
        assert!(p.spec.no_proxy.is_empty());

        reconcile_proxy_config(&mut p, &GlobalConfig::default());
        assert_eq!(p.spec, ProxySpec::default());
    }

    #[test]
    fn hosted_cluster_and_control_plane_agree() {
        let configuration = ClusterConfiguration {
            proxy: Some(proxy("http://proxy:8080", "", "example.com").spec),
        };
        let global_config = GlobalConfig::parse(Some(&configuration));

        let hcp = HostedControlPlane::new(
            "guest",
            HostedControlPlaneSpec {
                machine_cidr: MACHINE_CIDR.into(),
                pod_cidr: POD_CIDR.into(),
                service_cidr: SERVICE_CIDR.into(),
                platform: aws("eu-west-1"),
                ..Default::default()
            },
        );
        let hc = HostedCluster::new(
            "guest",
            HostedClusterSpec {
                networking: ClusterNetworking {
                    machine_cidr: MACHINE_CIDR.into(),
                    pod_cidr: POD_CIDR.into(),
                    service_cidr: SERVICE_CIDR.into(),
                },
                platform: aws("eu-west-1"),
                ..Default::default()
            },
        );

        let mut from_hcp = proxy_config();
        reconcile_proxy_config_with_status(&mut from_hcp, &hcp, &global_config).unwrap();
        let mut from_hc = proxy_config();
        reconcile_proxy_config_with_status_from_hosted_cluster(&mut from_hc, &hc, &global_config)
            .unwrap();
        assert_eq!(from_hcp, from_hc);
        assert!(members(&from_hcp).contains("example.com"));
    }

    proptest! {
        #[test]
        fn user_entry_order_does_not_matter(
            mut entries in proptest::collection::vec("[a-z]{1,8}\\.example", 0..8),
            region in "[a-z]{2}-[a-z]{4,7}-[1-3]",
        ) {
            let joined = entries.join(",");
            entries.reverse();
            let reversed = entries.join(",");

            let mut first = proxy("http://proxy:8080", "", &joined);
            let mut second = proxy("http://proxy:8080", "", &reversed);
            default_proxy_status(&mut first, MACHINE_CIDR, POD_CIDR, SERVICE_CIDR, &aws(&region)).unwrap();
            default_proxy_status(&mut second, MACHINE_CIDR, POD_CIDR, SERVICE_CIDR, &aws(&region)).unwrap();
            prop_assert_eq!(&first.status, &second.status);

            let mut again = first.clone();
            default_proxy_status(&mut again, MACHINE_CIDR, POD_CIDR, SERVICE_CIDR, &aws(&region)).unwrap();
            prop_assert_eq!(first.status, again.status);
        }
    }
}
