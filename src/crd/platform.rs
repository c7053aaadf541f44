use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::errors::Error;

/// The closed set of infrastructure backends a hosted cluster can run on
#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, JsonSchema)]
pub enum PlatformType {
    #[serde(rename = "AWS")]
    Aws,
    #[serde(rename = "Azure")]
    Azure,
    #[serde(rename = "PowerVS")]
    PowerVs,
    #[serde(rename = "KubeVirt")]
    KubeVirt,
    #[serde(rename = "Agent")]
    Agent,
    #[default]
    #[serde(rename = "None")]
    None,
}

impl PlatformType {
    pub const ALL: [PlatformType; 6] = [
        PlatformType::Aws,
        PlatformType::Azure,
        PlatformType::PowerVs,
        PlatformType::KubeVirt,
        PlatformType::Agent,
        PlatformType::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformType::Aws => "AWS",
            PlatformType::Azure => "Azure",
            PlatformType::PowerVs => "PowerVS",
            PlatformType::KubeVirt => "KubeVirt",
            PlatformType::Agent => "Agent",
            PlatformType::None => "None",
        }
    }

    /// Platforms exposing a link-local instance metadata endpoint
    pub fn has_metadata_endpoint(&self) -> bool {
        matches!(self, PlatformType::Aws | PlatformType::Azure)
    }
}

impl Display for PlatformType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformType {
    type Err = Error;

    /// Case-insensitive, so both CLI selectors (`powervs`) and API values (`PowerVS`) resolve
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlatformType::ALL
            .into_iter()
            .find(|platform| platform.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownPlatform(s.to_string()))
    }
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AwsPlatformSpec {
    pub region: String,
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AzurePlatformSpec {
    pub location: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_group: String,
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PowerVsPlatformSpec {
    pub region: String,
    pub zone: String,
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubevirtPlatformSpec {}

/// Platform of a hosted cluster. Only the sub-spec matching `type_` is meaningful
#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSpec {
    #[serde(rename = "type")]
    pub type_: PlatformType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsPlatformSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzurePlatformSpec>,
    #[serde(rename = "powervs", skip_serializing_if = "Option::is_none")]
    pub power_vs: Option<PowerVsPlatformSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubevirt: Option<KubevirtPlatformSpec>,
}

impl PlatformSpec {
    pub fn aws_region(&self) -> Result<&str, Error> {
        self.aws
            .as_ref()
            .map(|aws| aws.region.as_str())
            .ok_or_else(|| Error::PlatformMismatch {
                declared: self.type_,
                reason: "spec.platform.aws is not set".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_are_case_insensitive() {
        assert_eq!("powervs".parse::<PlatformType>().unwrap(), PlatformType::PowerVs);
        assert_eq!("AWS".parse::<PlatformType>().unwrap(), PlatformType::Aws);
        assert_eq!("kubevirt".parse::<PlatformType>().unwrap(), PlatformType::KubeVirt);
    }

    #[test]
    fn unknown_selector_is_rejected() {
        let err = "openstack".parse::<PlatformType>().unwrap_err();
        assert!(matches!(err, Error::UnknownPlatform(name) if name == "openstack"));
    }

    #[test]
    fn wire_names_match_api() {
        let json = serde_json::to_string(&PlatformType::PowerVs).unwrap();
        assert_eq!(json, "\"PowerVS\"");
        let parsed: PlatformType = serde_json::from_str("\"KubeVirt\"").unwrap();
        assert_eq!(parsed, PlatformType::KubeVirt);
    }

    #[test]
    fn aws_region_requires_sub_spec() {
        let spec = PlatformSpec {
            type_: PlatformType::Aws,
            ..Default::default()
        };
        assert!(matches!(spec.aws_region(), Err(Error::PlatformMismatch { .. })));
    }
}
