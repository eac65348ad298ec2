//! Routes parsed protocol requests through authentication into the catalog.

use tracing::error;
use uuid::Uuid;

use curio_auth::AuthService;
use curio_core::error::{AuthError, QueryError};
use curio_core::protocol::{Operation, Request, Response};

use crate::catalog::CatalogService;

/// Maps each [`Operation`] to the service call that implements it.
///
/// `login` is the only operation reachable without a token; everything else
/// is validated first and rejected with an `unauthorized` response when the
/// token is missing or bad.
#[derive(Clone)]
pub struct Dispatcher {
    auth: AuthService,
    catalog: CatalogService,
}

impl Dispatcher {
    pub fn new(auth: AuthService, catalog: CatalogService) -> Self {
        Self { auth, catalog }
    }

    pub async fn dispatch(&self, request: Request) -> Response {
        let Request { op, token } = request;

        if let Operation::Login { username, password } = &op {
            return match self.auth.login(username, password).await {
                Ok(issued) => Response::Token {
                    token: issued.token,
                    expires_at: issued.expires_at,
                },
                Err(e) => auth_failure(e),
            };
        }

        let Some(token) = token else {
            return Response::unauthorized("missing token");
        };

        match op {
            Operation::Refresh => match self.auth.refresh(&token).await {
                Ok(issued) => Response::Token {
                    token: issued.token,
                    expires_at: issued.expires_at,
                },
                Err(e) => auth_failure(e),
            },
            Operation::ChangePassword {
                old_password,
                new_password,
            } => match self
                .auth
                .change_password(&token, &old_password, &new_password)
                .await
            {
                Ok(()) => Response::ok(&"password changed"),
                Err(e) => auth_failure(e),
            },
            catalog_op => {
                if let Err(e) = self.auth.authenticate(&token) {
                    return auth_failure(e);
                }
                self.dispatch_catalog(catalog_op).await
            }
        }
    }

    async fn dispatch_catalog(&self, op: Operation) -> Response {
        match op {
            Operation::ListAll => list_response(self.catalog.list_all().await),
            Operation::GetById { id } => match self.catalog.get(id).await {
                Ok(Some(item)) => Response::ok(&item),
                Ok(None) => not_found(id),
                Err(e) => query_failure(e),
            },
            Operation::ListByCategory { category } => {
                list_response(self.catalog.list_by_category(category).await)
            }
            Operation::ListByYear { year } => list_response(self.catalog.list_by_year(year).await),
            Operation::Create { item } => match self.catalog.create(&item).await {
                Ok(()) => Response::ok(&item),
                Err(e) => query_failure(e),
            },
            Operation::Update { item } => match self.catalog.update(&item).await {
                Ok(true) => Response::ok(&item),
                Ok(false) => not_found(item.id),
                Err(e) => query_failure(e),
            },
            Operation::Delete { id } => match self.catalog.delete(id).await {
                Ok(true) => Response::ok(&id),
                Ok(false) => not_found(id),
                Err(e) => query_failure(e),
            },
            Operation::Login { .. } | Operation::Refresh | Operation::ChangePassword { .. } => {
                Response::error("operation does not target the catalog")
            }
        }
    }
}

fn list_response(result: Result<Vec<curio_core::types::Collectible>, QueryError>) -> Response {
    match result {
        Ok(items) => Response::ok(&items),
        Err(e) => query_failure(e),
    }
}

fn not_found(id: Uuid) -> Response {
    Response::error(format!("no collectible with id {id}"))
}

/// Auth failures either mean "who are you" or something internal. Only the
/// former is echoed to the client.
fn auth_failure(err: AuthError) -> Response {
    match err {
        AuthError::InvalidCredentials | AuthError::Token(_) => {
            Response::unauthorized(err.to_string())
        }
        AuthError::Query(e) => query_failure(e),
        AuthError::Hash(e) => {
            error!(error = %e, "hash failure during auth");
            Response::error("internal error")
        }
        AuthError::Internal(detail) => {
            error!(detail, "internal auth failure");
            Response::error("internal error")
        }
    }
}

/// Constraint violations are the client's fault and echoed; everything else
/// is logged server-side and sanitized.
fn query_failure(err: QueryError) -> Response {
    match err {
        QueryError::ConstraintViolation(detail) => {
            Response::error(format!("constraint violation: {detail}"))
        }
        other => {
            error!(error = %other, "query failed");
            Response::error("internal error")
        }
    }
}
