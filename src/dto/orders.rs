use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    dto::check_length,
    error::{AppError, AppResult},
    models::{Order, OrderItemProduct},
};

/// Text fields of the checkout form. The proof of payment travels alongside
/// as a multipart file and is validated by [`crate::upload`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateOrderForm {
    pub fullname: String,
    pub phone: String,
    pub address: String,
}

impl CreateOrderForm {
    pub fn validate(&self) -> AppResult<()> {
        check_length("fullname", self.fullname.trim(), 3, 100)?;
        validate_phone(self.phone.trim())?;
        let address = self.address.trim();
        if address.chars().count() < 5 {
            return Err(AppError::validation(
                "address",
                "Shorter than minimum length 5.",
            ));
        }
        Ok(())
    }
}

fn validate_phone(phone: &str) -> AppResult<()> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    let ok = (9..=15).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit());
    if !ok {
        return Err(AppError::validation("phone", "Invalid phone number."));
    }
    Ok(())
}

/// Multipart layout accepted by `POST /api/orders`.
#[derive(Debug, ToSchema)]
pub struct CreateOrderMultipart {
    pub fullname: String,
    pub phone: String,
    pub address: String,
    #[schema(value_type = String, format = Binary)]
    pub proof_of_payment: Vec<u8>,
}

/// Multipart layout accepted by `PUT /api/orders/set-on-the-way/{id}`.
#[derive(Debug, ToSchema)]
pub struct ReceiptMultipart {
    #[schema(value_type = String, format = Binary)]
    pub no_receipt: Vec<u8>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItemProduct>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderWithItems>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(fullname: &str, phone: &str, address: &str) -> CreateOrderForm {
        CreateOrderForm {
            fullname: fullname.into(),
            phone: phone.into(),
            address: address.into(),
        }
    }

    #[test]
    fn accepts_a_complete_form() {
        assert!(form("Jane Doe", "+6281234567890", "Jl. Merdeka 1").validate().is_ok());
        assert!(form("Jane", "081234567", "Main St").validate().is_ok());
    }

    #[test]
    fn reports_the_first_bad_field() {
        let err = form("Jo", "081234567", "Main St").validate().unwrap_err();
        assert_eq!(err.to_string(), "fullname: Shorter than minimum length 3.");

        let err = form(&"J".repeat(101), "081234567", "Main St")
            .validate()
            .unwrap_err();
        assert_eq!(err.to_string(), "fullname: Longer than maximum length 100.");

        for phone in ["12345", "0812-3456-789", "+", "1234567890123456"] {
            let err = form("Jane", phone, "Main St").validate().unwrap_err();
            assert_eq!(err.to_string(), "phone: Invalid phone number.");
        }

        let err = form("Jane", "081234567", "St").validate().unwrap_err();
        assert_eq!(err.to_string(), "address: Shorter than minimum length 5.");
    }
}
