use serde::de::DeserializeOwned;

use crate::types::ServiceError;

/// Resolved value of a backend call: either data or a service-reported error.
///
/// Transport failures never produce an envelope; they surface as the `Err`
/// side of the future that would have resolved to one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope<T> {
    Data(T),
    Error(ServiceError),
}

impl<T> Envelope<T> {
    /// Builds an envelope from the `{ data, error }` pair the backend SDKs use.
    ///
    /// An error always wins over data. A missing error with missing data is an
    /// empty success and resolves to `T::default()`.
    pub fn from_parts(data: Option<T>, error: Option<ServiceError>) -> Self
    where
        T: Default,
    {
        match (data, error) {
            (_, Some(err)) => Self::Error(err),
            (data, None) => Self::Data(data.unwrap_or_default()),
        }
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Maps the data side while preserving the error side.
    pub fn map<U, F>(self, f: F) -> Envelope<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Data(data) => Envelope::Data(f(data)),
            Self::Error(err) => Envelope::Error(err),
        }
    }

    /// Converts into a standard `Result`.
    pub fn into_result(self) -> Result<T, ServiceError> {
        match self {
            Self::Data(data) => Ok(data),
            Self::Error(err) => Err(err),
        }
    }
}

impl Envelope<serde_json::Value> {
    /// Decodes the data side into a typed value.
    ///
    /// A decoding failure becomes a service error with code `DECODE_ERROR`.
    pub fn decode<T: DeserializeOwned>(self) -> Envelope<T> {
        match self {
            Self::Data(value) => match serde_json::from_value(value) {
                Ok(data) => Envelope::Data(data),
                Err(err) => {
                    Envelope::Error(ServiceError::new(err.to_string()).with_code("DECODE_ERROR"))
                },
            },
            Self::Error(err) => Envelope::Error(err),
        }
    }
}
