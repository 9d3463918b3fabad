pub mod customer;
pub mod interaction;
pub mod property;
