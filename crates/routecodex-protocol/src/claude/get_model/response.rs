use super::types::ModelInfo;

pub type GetModelResponse = ModelInfo;
