pub mod resources;
pub mod server;
pub mod tools;
pub mod transport;
