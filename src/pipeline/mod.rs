/// Офлайн-этапы: подготовка данных и обучение модели

pub mod prepare;
pub mod train;

pub use prepare::{prepare, PrepareOutcome};
pub use train::{select_model, train, TrainOutcome};
