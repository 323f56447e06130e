pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Format error: {message}")]
	Format { message: String },
	#[error("Configuration error: {message}")]
	Configuration { message: String },
	#[error("Pagination error: {message}")]
	Pagination { message: String },
	#[error("Consistency error: {message}")]
	Consistency { message: String },
}
impl From<hyfuse_domain::Error> for Error {
	fn from(err: hyfuse_domain::Error) -> Self {
		match err {
			hyfuse_domain::Error::Format { message } => Self::Format { message },
		}
	}
}
