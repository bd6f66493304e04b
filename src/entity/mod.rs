//! SeaORM entity definitions.

pub mod forecast_result;
