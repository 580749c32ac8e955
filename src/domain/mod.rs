// Domain layer: definition/extra models and ports. Only std, serde and indexmap.

pub mod definition;
pub mod model;
pub mod ports;
