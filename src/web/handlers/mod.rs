// HTTP handlers, one module per route.

pub mod predict;
pub mod root;
