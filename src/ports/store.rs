use crate::ports::PortFuture;
use crate::store::StoreError;
use crate::types::template::{RemoteConfigTemplate, Revision};

#[derive(Debug, Clone)]
pub struct FetchedTemplate {
    pub template: RemoteConfigTemplate,
    pub revision: Revision,
}

/// The remote template store. `publish` must reject with
/// [`StoreError::PublishConflict`] when `revision` is no longer current.
pub trait TemplateStore: Send + Sync + 'static {
    fn fetch<'a>(&'a self) -> PortFuture<'a, FetchedTemplate, StoreError>;

    fn publish<'a>(
        &'a self,
        template: RemoteConfigTemplate,
        revision: &'a Revision,
    ) -> PortFuture<'a, RemoteConfigTemplate, StoreError>;
}
