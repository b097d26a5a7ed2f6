pub mod derived;
pub mod distance;
pub mod global_scope;
pub mod head;
pub mod local_index;
