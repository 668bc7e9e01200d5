pub mod config;
pub mod document;
pub mod view;
pub mod window;
