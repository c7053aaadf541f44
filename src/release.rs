use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::Error;

/// Resolves logical component names to image references from a release payload
pub trait ReleaseImageProvider: Send + Sync {
    fn component_image(&self, component: &str) -> Option<&str>;

    fn require_image(&self, component: &str) -> Result<String, Error> {
        self.component_image(component)
            .map(String::from)
            .ok_or_else(|| Error::MissingComponentImage(component.to_string()))
    }
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, JsonSchema)]
pub struct ComponentImages(pub BTreeMap<String, String>);

impl ReleaseImageProvider for ComponentImages {
    fn component_image(&self, component: &str) -> Option<&str> {
        self.0.get(component).map(String::as_str)
    }
}

impl<const N: usize> From<[(&str, &str); N]> for ComponentImages {
    fn from(images: [(&str, &str); N]) -> Self {
        ComponentImages(
            images
                .into_iter()
                .map(|(component, image)| (component.to_string(), image.to_string()))
                .collect(),
        )
    }
}
