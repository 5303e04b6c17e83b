pub mod cart;
pub mod orders;

use crate::error::{AppError, AppResult};

pub(crate) fn check_length(field: &str, value: &str, min: usize, max: usize) -> AppResult<()> {
    let len = value.chars().count();
    if len < min {
        return Err(AppError::validation(
            field,
            format!("Shorter than minimum length {}.", min),
        ));
    }
    if len > max {
        return Err(AppError::validation(
            field,
            format!("Longer than maximum length {}.", max),
        ));
    }
    Ok(())
}
