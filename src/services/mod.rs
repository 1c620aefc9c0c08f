//! 服务模块

pub mod prediction;

pub use prediction::{PredictionService, PredictionServiceImpl, create_prediction_service};
