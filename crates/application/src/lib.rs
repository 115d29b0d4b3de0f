//! Application services and ports for the role index.

#![forbid(unsafe_code)]

mod event_handler;
mod ports;
mod query_rewriter;
mod role_store_service;

#[cfg(test)]
pub(crate) mod test_fakes;

pub use event_handler::RoleIndexEventHandler;
pub use ports::{
    IndexStateRepository, RoleAssignmentRepository, SchemaStatus, TenantDirectory, UserDirectory,
};
pub use query_rewriter::QueryRewriter;
pub use role_store_service::RoleStoreService;
