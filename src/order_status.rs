//! Order lifecycle.
//!
//! ```text
//! ongoing ──admin──▶ reject
//!    │
//!    └────admin──▶ on the way ──owner──▶ success
//! ```
//!
//! `reject` and `success` are terminal. Guards run in a fixed order:
//! existence, then authorization, then the status guard in [`Transition::check_from`].

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum OrderStatus {
    #[serde(rename = "ongoing")]
    Ongoing,
    #[serde(rename = "reject")]
    Reject,
    #[serde(rename = "on the way")]
    OnTheWay,
    #[serde(rename = "success")]
    Success,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Ongoing,
        OrderStatus::Reject,
        OrderStatus::OnTheWay,
        OrderStatus::Success,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Ongoing => "ongoing",
            OrderStatus::Reject => "reject",
            OrderStatus::OnTheWay => "on the way",
            OrderStatus::Success => "success",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Reject | OrderStatus::Success)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                AppError::validation(
                    "status",
                    "Must be one of: 'ongoing', 'reject', 'on the way', 'success'.",
                )
            })
    }
}

/// Who may fire a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Admin,
    Owner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Reject,
    Dispatch,
    ConfirmReceipt,
}

impl Transition {
    pub fn from_status(&self) -> OrderStatus {
        match self {
            Transition::Reject | Transition::Dispatch => OrderStatus::Ongoing,
            Transition::ConfirmReceipt => OrderStatus::OnTheWay,
        }
    }

    pub fn to_status(&self) -> OrderStatus {
        match self {
            Transition::Reject => OrderStatus::Reject,
            Transition::Dispatch => OrderStatus::OnTheWay,
            Transition::ConfirmReceipt => OrderStatus::Success,
        }
    }

    pub fn actor(&self) -> Actor {
        match self {
            Transition::Reject | Transition::Dispatch => Actor::Admin,
            Transition::ConfirmReceipt => Actor::Owner,
        }
    }

    /// Reserved stock goes back to the catalog only when an order is rejected.
    pub fn releases_stock(&self) -> bool {
        matches!(self, Transition::Reject)
    }

    /// Closed orders never move again, whatever the source state says.
    pub fn check_from(&self, current: OrderStatus) -> Result<(), AppError> {
        if current.is_terminal() || current != self.from_status() {
            return Err(AppError::InvalidTransition(self.guard_message()));
        }
        Ok(())
    }

    pub fn guard_message(&self) -> String {
        let label = match self {
            Transition::Reject => "rejected",
            Transition::Dispatch => "on the way",
            Transition::ConfirmReceipt => "success",
        };
        format!(
            "Cannot change status {} if status other than {}.",
            label,
            self.from_status()
        )
    }

    pub fn success_message(&self) -> String {
        format!("Successfully set the order to {}.", self.to_status())
    }

    pub fn audit_action(&self) -> &'static str {
        match self {
            Transition::Reject => "order_reject",
            Transition::Dispatch => "order_on_the_way",
            Transition::ConfirmReceipt => "order_success",
        }
    }
}
