pub mod emails;
pub mod labels;
pub mod sync;
pub mod users;
