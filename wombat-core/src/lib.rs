pub mod building;
pub mod catalog;
pub mod debounce;
pub mod mods;
pub mod saveload;
pub mod store;
