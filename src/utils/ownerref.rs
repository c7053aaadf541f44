use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};

/// A back-reference to the object that owns generated children.
///
/// Children carrying it are garbage collected together with the owner.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnerRef {
    reference: OwnerReference,
}

impl OwnerRef {
    pub fn from_object<K>(owner: &K) -> OwnerRef
    where
        K: Resource<DynamicType = ()>,
    {
        OwnerRef {
            reference: OwnerReference {
                api_version: K::api_version(&()).to_string(),
                kind: K::kind(&()).to_string(),
                name: owner.name_any(),
                uid: owner.uid().unwrap_or_default(),
                controller: Some(true),
                block_owner_deletion: Some(true),
            },
        }
    }

    pub fn reference(&self) -> &OwnerReference {
        &self.reference
    }

    /// Make this owner the one and only owner of `object`
    pub fn apply_to<K: Resource>(&self, object: &mut K) {
        object.meta_mut().owner_references = Some(vec![self.reference.clone()]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::hostedcontrolplane::HostedControlPlane;
    use k8s_openapi::api::core::v1::ConfigMap;

    fn owner() -> HostedControlPlane {
        let mut hcp = HostedControlPlane::new("guest", Default::default());
        hcp.metadata.namespace = Some("clusters-guest".into());
        hcp.metadata.uid = Some("6c1f0c54-2b4f-4d0a-9ab4-5b8e0b8ae3f1".into());
        hcp
    }

    #[test]
    fn reference_identifies_owner() {
        let owner_ref = OwnerRef::from_object(&owner());
        let reference = owner_ref.reference();
        assert_eq!(reference.api_version, "hypershift.openshift.io/v1alpha1");
        assert_eq!(reference.kind, "HostedControlPlane");
        assert_eq!(reference.name, "guest");
        assert_eq!(reference.uid, "6c1f0c54-2b4f-4d0a-9ab4-5b8e0b8ae3f1");
        assert_eq!(reference.controller, Some(true));
        assert_eq!(reference.block_owner_deletion, Some(true));
    }

    #[test]
    fn same_owner_gives_equal_references() {
        assert_eq!(OwnerRef::from_object(&owner()), OwnerRef::from_object(&owner()));

        let mut other = owner();
        other.metadata.uid = Some("0d6a7c1e-5f3b-4a2c-8e9d-7b6a5c4d3e2f".into());
        assert_ne!(OwnerRef::from_object(&owner()), OwnerRef::from_object(&other));
    }

    #[test]
    fn apply_replaces_previous_owners() {
        let owner_ref = OwnerRef::from_object(&owner());
        let mut cm = ConfigMap::default();
        cm.metadata.owner_references = Some(vec![OwnerReference {
            api_version: "v1".into(),
            kind: "Namespace".into(),
            name: "stale".into(),
            uid: "stale".into(),
            ..Default::default()
        }]);

        owner_ref.apply_to(&mut cm);
        assert_eq!(cm.owner_references(), &[owner_ref.reference().clone()]);
    }

    #[test]
    fn apply_is_idempotent() {
        let owner_ref = OwnerRef::from_object(&owner());
        let mut cm = ConfigMap::default();
        owner_ref.apply_to(&mut cm);
        let once = serde_json::to_vec(&cm).unwrap();
        owner_ref.apply_to(&mut cm);
        assert_eq!(once, serde_json::to_vec(&cm).unwrap());
    }
}
