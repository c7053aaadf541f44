/// Generate `$fn_name(resource, status, client)`, replacing the status subresource of a
/// namespaced custom resource. The write is guarded by the resource version it was read at
#[macro_export]
macro_rules! create_set_status {
    ($resource_type:ident, $resource_status_type:ident, $fn_name:ident) => {
        #[instrument(skip(resource, client))]
        pub async fn $fn_name(
            resource: &$resource_type,
            status: $resource_status_type,
            client: Client,
        ) -> Result<(), Error> {
            let name = resource
                .meta()
                .name
                .clone()
                .ok_or_else(|| Error::MissingField("metadata.name".into()))?;
            let namespace = resource
                .meta()
                .namespace
                .clone()
                .ok_or_else(|| Error::MissingField("metadata.namespace".into()))?;
            let api: Api<$resource_type> = Api::namespaced(client, &namespace);
            let status_update = json!({
                "apiVersion": $resource_type::api_version(&()),
                "kind": $resource_type::kind(&()),
                "metadata": {
                    "name": name,
                    "resourceVersion": ResourceExt::resource_version(resource),
                },
                "status": status,
            });
            api.replace_status(
                &name,
                &PostParams::default(),
                serde_json::to_vec(&status_update)?,
            )
            .await?;
            Ok(())
        }
    };
}

#[macro_export]
macro_rules! ok_and_requeue {
    ($duration:expr) => {
        Ok(Action::requeue(Duration::from_secs($duration)))
    };
}

#[macro_export]
macro_rules! ok_no_requeue {
    () => {
        Ok(Action::await_change())
    };
}
