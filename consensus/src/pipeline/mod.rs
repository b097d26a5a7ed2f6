pub mod applier;
pub mod rules;
pub mod switcher;
