use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("local I/O error: {0}")]
    Io(#[from] std::io::Error),
}
