use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::check_length,
    error::{AppError, AppResult},
    models::CartLineProduct,
    repository::StockFilter,
};

/// Parsed from [`PutProductRequest::operation`] during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartOperation {
    /// Adds to the quantity already in the basket.
    Create,
    /// Replaces the quantity in the basket.
    Update,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PutProductRequest {
    /// `create` or `update`.
    pub operation: String,
    pub product_id: Uuid,
    pub notes: Option<String>,
    pub qty: i32,
}

impl PutProductRequest {
    pub fn validate(&self) -> AppResult<CartOperation> {
        let operation = match self.operation.as_str() {
            "create" => CartOperation::Create,
            "update" => CartOperation::Update,
            _ => {
                return Err(AppError::validation(
                    "operation",
                    "Must be one of: create, update.",
                ));
            }
        };
        if self.qty < 1 {
            return Err(AppError::validation(
                "qty",
                "Must be greater than or equal to 1.",
            ));
        }
        if let Some(notes) = self.normalized_notes() {
            check_length("notes", &notes, 3, 100)?;
        }
        Ok(operation)
    }

    /// Blank notes are stored as no notes.
    pub fn normalized_notes(&self) -> Option<String> {
        self.notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CartListQuery {
    #[serde(default)]
    pub stock: StockFilter,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ListIdRequest {
    pub list_id: Vec<Uuid>,
}

impl ListIdRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.list_id.is_empty() {
            return Err(AppError::validation(
                "list_id",
                "Shorter than minimum length 1.",
            ));
        }
        let mut seen = HashSet::with_capacity(self.list_id.len());
        if !self.list_id.iter().all(|id| seen.insert(*id)) {
            return Err(AppError::validation("list_id", "Items must be unique."));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CartList {
    #[schema(value_type = Vec<CartLineProduct>)]
    pub items: Vec<CartLineProduct>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RemovedCount {
    pub requested: usize,
    pub removed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StagedCount {
    pub requested: usize,
    pub staged: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(operation: &str, qty: i32, notes: Option<&str>) -> PutProductRequest {
        PutProductRequest {
            operation: operation.into(),
            product_id: Uuid::new_v4(),
            notes: notes.map(str::to_string),
            qty,
        }
    }

    #[test]
    fn put_product_checks_operation_qty_and_notes() {
        assert_eq!(
            put("create", 1, None).validate().unwrap(),
            CartOperation::Create
        );
        assert_eq!(
            put("update", 3, Some("  ")).validate().unwrap(),
            CartOperation::Update
        );

        let err = put("delete", 1, None).validate().unwrap_err();
        assert_eq!(err.to_string(), "operation: Must be one of: create, update.");

        assert!(put("create", 0, None).validate().is_err());

        let err = put("create", 1, Some("ab")).validate().unwrap_err();
        assert_eq!(err.to_string(), "notes: Shorter than minimum length 3.");

        let long = "x".repeat(101);
        let err = put("create", 1, Some(&long)).validate().unwrap_err();
        assert_eq!(err.to_string(), "notes: Longer than maximum length 100.");
    }

    #[test]
    fn list_id_must_be_non_empty_and_unique() {
        let id = Uuid::new_v4();
        assert!(ListIdRequest { list_id: vec![] }.validate().is_err());
        assert!(ListIdRequest { list_id: vec![id, id] }.validate().is_err());
        assert!(
            ListIdRequest {
                list_id: vec![id, Uuid::new_v4()]
            }
            .validate()
            .is_ok()
        );
    }

    #[test]
    fn stock_filter_defaults_to_everything() {
        let query: CartListQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.stock, StockFilter::None);
        let query: CartListQuery = serde_json::from_str(r#"{"stock":"empty"}"#).unwrap();
        assert_eq!(query.stock, StockFilter::Empty);
    }
}
