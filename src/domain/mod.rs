// Domain layer - Plain telemetry data types
pub mod live;
pub mod parameter;
pub mod plot;
pub mod telemetry;
