use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{registry} id '{id}' is already registered")]
    DuplicateId { registry: &'static str, id: String },
    #[error("{registry} id '{id}' is not registered")]
    UnknownId { registry: &'static str, id: String },
    #[error("listener '{id}' appears more than once in the build order")]
    DuplicateInOrder { id: String },
}
