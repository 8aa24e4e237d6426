use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use serde::Serialize;

use crate::app::errors;
use crate::app::services::ServiceResult;

/// Map a service result to `status` + JSON body, or to the error response.
pub fn respond<T, U>(status: StatusCode, result: ServiceResult<T>) -> Response
where
    U: From<T> + Serialize,
{
    match result {
        Ok(value) => (status, Json(U::from(value))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Same as [`respond`] for list endpoints.
pub fn respond_list<T, U>(result: ServiceResult<Vec<T>>) -> Response
where
    U: From<T> + Serialize,
{
    match result {
        Ok(items) => Json(crate::app::dto::list::<T, U>(items)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
