//! Request DTOs, query strings and the extractors that render rejections as
//! JSON errors.

use axum::extract::{FromRequest, FromRequestParts};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

use depot_core::{LocationId, ProductId};
use depot_infra::Pagination;
use depot_infra::services::ServiceError;
use depot_inventory::{LedgerFilter, MoveType};

use crate::app::errors::ApiError;

// -------------------------
// Extractors
// -------------------------

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct AppPath<T>(pub T);

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StockQuery {
    pub location_id: Option<LocationId>,
}

/// `GET /ledger` query string.
#[derive(Debug, Default, Deserialize)]
pub struct LedgerQuery {
    pub product_id: Option<ProductId>,
    pub location_id: Option<LocationId>,
    pub move_type: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl LedgerQuery {
    pub fn into_parts(self) -> Result<(LedgerFilter, Pagination), ServiceError> {
        let move_type = match self.move_type.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<MoveType>()?),
        };
        let filter = LedgerFilter {
            product_id: self.product_id,
            location_id: self.location_id,
            move_type,
            from: self.from_date.as_deref().map(|d| parse_bound(d, Bound::Start)).transpose()?,
            to: self.to_date.as_deref().map(|d| parse_bound(d, Bound::End)).transpose()?,
        };
        Ok((filter, Pagination::new(self.limit, self.offset)))
    }
}

#[derive(Debug, Copy, Clone)]
enum Bound {
    Start,
    End,
}

/// RFC 3339, a naive timestamp (taken as UTC) or a bare date. A bare date
/// covers the whole day.
fn parse_bound(raw: &str, bound: Bound) -> Result<DateTime<Utc>, ServiceError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(ts.and_utc());
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ServiceError::validation(format!("invalid date '{raw}'")))?;
    let ts = match bound {
        Bound::Start => date.and_hms_opt(0, 0, 0),
        Bound::End => date.and_hms_nano_opt(23, 59, 59, 999_999_999),
    };
    ts.map(|t| t.and_utc())
        .ok_or_else(|| ServiceError::validation(format!("invalid date '{raw}'")))
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn bare_dates_cover_the_whole_day() {
        let query = LedgerQuery {
            from_date: Some("2024-03-01".to_string()),
            to_date: Some("2024-03-02".to_string()),
            ..Default::default()
        };
        let (filter, _) = query.into_parts().unwrap();
        let from = filter.from.unwrap();
        let to = filter.to.unwrap();
        assert_eq!((from.day(), from.hour()), (1, 0));
        assert_eq!((to.day(), to.hour(), to.minute()), (2, 23, 59));
    }

    #[test]
    fn timestamps_and_move_types_are_parsed() {
        let query = LedgerQuery {
            move_type: Some("adjust".to_string()),
            from_date: Some("2024-03-01T10:00:00Z".to_string()),
            to_date: Some("2024-03-01T12:30:00".to_string()),
            limit: Some(5),
            ..Default::default()
        };
        let (filter, page) = query.into_parts().unwrap();
        assert_eq!(filter.move_type, Some(MoveType::Adjust));
        assert_eq!(filter.from.unwrap().hour(), 10);
        assert_eq!(filter.to.unwrap().minute(), 30);
        assert_eq!(page.limit, 5);
        assert_eq!(page.offset, 0);
    }

    #[test]
    fn unknown_move_types_and_bad_dates_are_validation_errors() {
        let bad_kind = LedgerQuery {
            move_type: Some("teleport".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad_kind.into_parts(), Err(ServiceError::Validation(_))));

        let bad_date = LedgerQuery {
            from_date: Some("yesterday".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad_date.into_parts(), Err(ServiceError::Validation(_))));
    }
}
