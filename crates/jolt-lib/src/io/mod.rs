pub mod delimited;
pub mod text;
