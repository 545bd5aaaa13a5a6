pub mod crossref;
pub mod markup;
pub mod ticket;
