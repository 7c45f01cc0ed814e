pub mod gateway;
pub mod schemas;

pub use gateway::{ApiRequest, Gateway, RefreshHook};
