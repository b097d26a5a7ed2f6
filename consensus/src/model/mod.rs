pub mod stores;
pub mod wot;
