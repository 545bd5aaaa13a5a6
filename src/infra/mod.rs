pub mod github;
pub mod trac_csv;
