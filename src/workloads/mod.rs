pub mod echo;
pub mod unique_id;
