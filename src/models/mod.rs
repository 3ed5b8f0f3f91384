pub mod b2b_product;
pub mod escrow;
pub mod notification;
pub mod order;
pub mod tracking;
pub mod verification;
