// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod yamcs_archive;
pub mod yamcs_mapper;
pub mod yamcs_websocket;
