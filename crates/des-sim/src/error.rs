use des_core::DesError;
use des_kernel::KernelError;
use des_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] DesError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("logical process thread panicked: {0}")]
    Panicked(String),

    #[error("simulation has already run")]
    AlreadyRun,
}

pub type SimResult<T> = Result<T, SimError>;
