pub mod collision;
pub mod estimator;
pub mod event;
pub mod framework;
pub mod manager;
pub mod materials;
pub mod particle;
pub mod properties;
pub mod source;
