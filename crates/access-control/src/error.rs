use thiserror::Error;

#[derive(Debug, Error)]
pub enum AcError {
    #[error(transparent)]
    Store(#[from] directoryd_store::StoreError),

    #[error(transparent)]
    Filter(#[from] directoryd_filter::FilterError),
}

pub type Result<T> = std::result::Result<T, AcError>;
