pub mod customer;
pub mod quality;
pub mod ticket;
