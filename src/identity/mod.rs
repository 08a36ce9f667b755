pub mod manager;
pub mod model;
pub mod password;

pub use manager::IdentityManager;
