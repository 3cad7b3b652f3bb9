// Domain layer: ARXML model types and the ports the pipeline depends on.

pub mod interface;
pub mod model;
pub mod ports;
