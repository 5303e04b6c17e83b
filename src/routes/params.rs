use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::{AppError, AppResult},
    order_status::OrderStatus,
};

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    /// Returns `(page, per_page, offset)`, rejecting out-of-range values.
    pub fn normalize(&self) -> AppResult<(i64, i64, i64)> {
        let page = self.page.unwrap_or(1);
        if page < 1 {
            return Err(AppError::validation(
                "page",
                "Must be greater than or equal to 1.",
            ));
        }
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE);
        if !(1..=MAX_PER_PAGE).contains(&per_page) {
            return Err(AppError::validation(
                "per_page",
                format!("Must be between 1 and {}.", MAX_PER_PAGE),
            ));
        }
        let offset = (page - 1)
            .checked_mul(per_page)
            .ok_or_else(|| AppError::validation("page", "Page is out of range."))?;
        Ok((page, per_page, offset))
    }
}

// Query strings do not mix with `#[serde(flatten)]` for numeric fields, so the
// paging fields are repeated here.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// One of `ongoing`, `reject`, `on the way`, `success`.
    pub status: Option<String>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }

    pub fn status(&self) -> AppResult<Option<OrderStatus>> {
        self.status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_bounds() {
        assert_eq!(Pagination::default().normalize().unwrap(), (1, 20, 0));
        let p = Pagination {
            page: Some(3),
            per_page: Some(10),
        };
        assert_eq!(p.normalize().unwrap(), (3, 10, 20));

        for (page, per_page) in [(0, 10), (1, 0), (1, 101)] {
            let p = Pagination {
                page: Some(page),
                per_page: Some(per_page),
            };
            assert!(p.normalize().is_err());
        }
    }

    #[test]
    fn huge_page_is_rejected_instead_of_overflowing() {
        let p = Pagination {
            page: Some(i64::MAX),
            per_page: Some(MAX_PER_PAGE),
        };
        let err = p.normalize().unwrap_err();
        assert_eq!(err.to_string(), "page: Page is out of range.");

        let last = Pagination {
            page: Some(i64::MAX),
            per_page: Some(1),
        };
        assert_eq!(last.normalize().unwrap().2, i64::MAX - 1);
    }

    #[test]
    fn status_filter_accepts_known_values_only() {
        let q = OrderListQuery {
            status: Some("on the way".into()),
            ..Default::default()
        };
        assert_eq!(q.status().unwrap(), Some(OrderStatus::OnTheWay));

        let q = OrderListQuery {
            status: Some("shipped".into()),
            ..Default::default()
        };
        assert!(q.status().is_err());

        assert_eq!(OrderListQuery::default().status().unwrap(), None);
    }
}
