pub mod disk_file_store;
pub mod file_store;
pub mod janitor;
pub mod metadata;
pub mod part_size;
pub mod paths;
pub mod registry;
pub mod sessions;
