//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod postgres_index_state_repository;
mod postgres_platform_directory;
mod postgres_role_assignment_repository;
mod postgres_user_search;

#[cfg(test)]
pub(crate) mod pg_test_support;

pub use postgres_index_state_repository::PostgresIndexStateRepository;
pub use postgres_platform_directory::PostgresPlatformDirectory;
pub use postgres_role_assignment_repository::PostgresRoleAssignmentRepository;
pub use postgres_user_search::PostgresUserSearch;
