#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("malformed reply: {0}")]
    MalformedReply(String),
    #[error("missing component: {0}")]
    MissingComponent(String),
    #[error("{0} out of range: {1}")]
    OutOfRange(String, f64),
    #[error("inconsistent flags on {0}: warrants_investigation set but priority is 0")]
    InconsistentFlags(String),
}

impl From<empirica_vector::VectorError> for ParserError {
    fn from(err: empirica_vector::VectorError) -> Self {
        match err {
            empirica_vector::VectorError::MissingComponent(name) => {
                ParserError::MissingComponent(name)
            }
            empirica_vector::VectorError::Invalid(name, source) => match source {
                empirica_vector::component::ComponentError::OutOfRange(field, value) => {
                    ParserError::OutOfRange(format!("{name}.{field}"), value)
                }
                empirica_vector::component::ComponentError::InconsistentFlags => {
                    ParserError::InconsistentFlags(name)
                }
            },
        }
    }
}
