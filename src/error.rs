use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::repo::RepoError;
use crate::rpc::RpcResponse;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    /// Envelope could not be read or named no known action.
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            // domain failures travel inside the envelope, like the hosted endpoint does
            ApiError::Repo(_) => StatusCode::OK,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(RpcResponse::failure(self.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_rt::test]
    async fn repo_errors_answer_ok_with_failure_envelope() {
        let err = ApiError::from(RepoError::NotFound("task"));
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let env: RpcResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(env, RpcResponse::failure("task not found"));
    }

    #[test]
    fn bad_request_is_400() {
        assert_eq!(ApiError::BadRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
    }
}
