pub mod query;
pub mod similarity;
pub mod text;
