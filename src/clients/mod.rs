//! API 客户端模块

pub mod ren3_client;

pub use ren3_client::{with_retries, Ren3Client};
