pub mod font;
pub mod preview_worker;
pub mod spool;
