/// Модуль предобработки данных

pub mod feature_engineering;
pub mod normalization;
pub mod split;

pub use feature_engineering::{FeatureEngineer, FeatureMatrix, InferenceFeatures, LABEL_COLUMNS};
pub use normalization::DataNormalizer;
pub use split::{stratified_split, SplitIndices};
