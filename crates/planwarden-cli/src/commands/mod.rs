pub mod inspect;
pub mod modules;
pub mod validate;
