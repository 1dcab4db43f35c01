// Services module - Business logic

pub mod card_service;
pub mod lifecycle;
pub mod notifier;
pub mod qr_generator;
pub mod scan_verifier;
pub mod signature;
pub mod token;
