// Services module - Business logic

pub mod status_registry;
