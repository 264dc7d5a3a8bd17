pub mod portal;
pub mod stats;
pub mod upload;
