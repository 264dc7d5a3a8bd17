pub mod files;
pub mod health;
pub mod music;
pub mod portal;
pub mod stats;
pub mod upload;
