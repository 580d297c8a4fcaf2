mod declaration;
mod resolvers;
mod types;

pub use declaration::{load_catalog, parse_catalog, MEMBER_GROUP_RESOLVER};
pub use resolvers::{MemberGroupResolver, MEMBER_GROUP_TYPE_ATTR};
pub use types::{
    CustomResolver, InstanceId, RefDescriptor, RefTarget, ReferenceCatalog, ResourceSpec,
    ResourceSpecBuilder, ResourceType,
};

use crate::attribute::AttrPathError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid attribute path: {0}")]
    Path(#[from] AttrPathError),

    #[error("Invalid reference {resource_type}.{path}: {reason}")]
    InvalidReference {
        resource_type: String,
        path: String,
        reason: String,
    },

    #[error("Unknown custom resolver '{0}'")]
    UnknownResolver(String),
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
