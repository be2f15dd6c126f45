// Domain layer: fax job model and the ports backends and parsers implement.

pub mod model;
pub mod ports;
