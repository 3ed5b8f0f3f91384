pub mod escrow_service;
pub mod jwt;
pub mod notification_service;
pub mod order_service;
pub mod tracking_service;
pub mod verification_service;
