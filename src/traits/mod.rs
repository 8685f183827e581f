pub mod migration;
pub mod model;
pub mod store;
