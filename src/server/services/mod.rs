//! Business logic services for the hpsdrflash server

pub mod flash_service;

pub use flash_service::FlashService;
