pub mod interrupt;
pub mod remote;
pub mod runner;
pub mod ticket;
