use kube::Resource;

pub fn get_version_string() -> String {
    format!("{}-{}", env!("GIT_COUNT"), env!("GIT_HASH"))
}

/// Field manager name used for every write made by the given subsystem
pub fn field_manager(subsystem: &str) -> String {
    format!("hosted-cluster-controller.{subsystem}")
}

pub fn name_namespaced<T>(resource: &T) -> String
where
    T: Resource,
{
    format!(
        "{}/{}",
        resource.meta().namespace.as_deref().unwrap_or("<no namespace>"),
        resource.meta().name.as_deref().unwrap_or("<no name>")
    )
}
