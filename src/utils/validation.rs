use crate::utils::error::{ParkingError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(ParkingError::validation(field_name, "Path cannot be empty"));
    }

    if path.contains('\0') {
        return Err(ParkingError::validation(field_name, "Path contains null bytes"));
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(ParkingError::validation(
            field_name,
            format!("Value must be at least {}, got {}", min_value, value),
        ));
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value
        .as_ref()
        .ok_or_else(|| ParkingError::validation(field_name, "Field is required"))
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ParkingError::validation(
            field_name,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

/// 必填且非空白的字串欄位
pub fn required_text(field_name: &str, value: &Option<String>) -> Result<String> {
    let text = validate_required_field(field_name, value)?;
    validate_non_empty_string(field_name, text)?;
    Ok(text.clone())
}

pub fn validate_one_of(field_name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if !allowed.contains(&value) {
        return Err(ParkingError::validation(
            field_name,
            format!("Unsupported value `{}`. Allowed: {}", value, allowed.join(", ")),
        ));
    }
    Ok(())
}
