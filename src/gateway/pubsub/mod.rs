pub mod bridge;
pub mod presence;
pub mod registry;
