pub mod api;
pub mod convert;
pub mod transport;
pub mod wire;
