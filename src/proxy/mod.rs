pub mod handler;
pub mod header;
pub mod request;
pub mod server;
pub mod transform;
pub mod upstream;
