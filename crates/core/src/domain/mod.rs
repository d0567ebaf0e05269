pub mod conversation;
pub mod intent;
pub mod product;
pub mod troubleshooting;
