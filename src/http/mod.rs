pub mod backend;
pub mod client;
pub mod refresh;

pub use backend::{ApiRequest, Body, HttpBackend, Method, RawResponse, ReqwestBackend, UploadFile};
pub use client::ApiClient;
pub use refresh::RefreshCoordinator;
