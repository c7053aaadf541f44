use crate::errors::Error;
use crate::release::ReleaseImageProvider;

pub const KUBEVIRT_CSI_DRIVER_COMPONENT: &str = "kubevirt-csi-driver";
pub const CSI_PROVISIONER_COMPONENT: &str = "csi-external-provisioner";
pub const CSI_ATTACHER_COMPONENT: &str = "csi-external-attacher";
pub const CSI_LIVENESS_PROBE_COMPONENT: &str = "csi-livenessprobe";
pub const CSI_NODE_DRIVER_REGISTRAR_COMPONENT: &str = "csi-node-driver-registrar";

/// Images of the controller deployment, resolved up front so a missing one fails the
/// mutator before it writes anything
pub(super) struct ControllerImages {
    pub driver: String,
    pub provisioner: String,
    pub attacher: String,
    pub liveness_probe: String,
}

impl ControllerImages {
    pub fn resolve(images: &dyn ReleaseImageProvider) -> Result<ControllerImages, Error> {
        Ok(ControllerImages {
            driver: images.require_image(KUBEVIRT_CSI_DRIVER_COMPONENT)?,
            provisioner: images.require_image(CSI_PROVISIONER_COMPONENT)?,
            attacher: images.require_image(CSI_ATTACHER_COMPONENT)?,
            liveness_probe: images.require_image(CSI_LIVENESS_PROBE_COMPONENT)?,
        })
    }
}

pub(super) struct NodeImages {
    pub driver: String,
    pub registrar: String,
    pub liveness_probe: String,
}

impl NodeImages {
    pub fn resolve(images: &dyn ReleaseImageProvider) -> Result<NodeImages, Error> {
        Ok(NodeImages {
            driver: images.require_image(KUBEVIRT_CSI_DRIVER_COMPONENT)?,
            registrar: images.require_image(CSI_NODE_DRIVER_REGISTRAR_COMPONENT)?,
            liveness_probe: images.require_image(CSI_LIVENESS_PROBE_COMPONENT)?,
        })
    }
}
