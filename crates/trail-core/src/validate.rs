use serde_json::{Map, Value};
use thiserror::Error;

/// A validated latitude/longitude pair. Both values are finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Body is not a JSON object, or `lat`/`lon` is missing or null.
    #[error("missing or malformed location data")]
    InvalidPayload,

    /// `lat` or `lon` is present but not a finite number.
    #[error("invalid coordinate values")]
    InvalidCoordinate,
}

/// Decode a raw request body into coordinates.
///
/// Both keys are checked for presence before either value is parsed, so a
/// body with a bad `lat` and no `lon` reports `InvalidPayload`. Values may be
/// JSON numbers or numeric strings; no geographic range check is applied.
/// Number literals are kept verbatim while decoding (`arbitrary_precision`),
/// so a literal that overflows `f64` is reported as `InvalidCoordinate`.
pub fn parse_coordinates(body: &[u8]) -> Result<Coordinates, ValidationError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|_| ValidationError::InvalidPayload)?;

    let Value::Object(fields) = value else {
        return Err(ValidationError::InvalidPayload);
    };

    let lat = required_field(&fields, "lat")?;
    let lon = required_field(&fields, "lon")?;

    Ok(Coordinates {
        lat: parse_float(lat)?,
        lon: parse_float(lon)?,
    })
}

fn required_field<'a>(
    fields: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a Value, ValidationError> {
    match fields.get(key) {
        None | Some(Value::Null) => Err(ValidationError::InvalidPayload),
        Some(value) => Ok(value),
    }
}

fn parse_float(value: &Value) -> Result<f64, ValidationError> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed
        .filter(|number| number.is_finite())
        .ok_or(ValidationError::InvalidCoordinate)
}
