//! Access control middleware.
//!
//! This middleware can be placed on any route or service. It parses the identity headers the
//! fronting identity proxy injected (see [`crate::auth`]) and checks the resolved roles against
//! the roles the route requires. Requests without an identity get a 401; requests whose identity
//! lacks a required role get a 403.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::{
    future::{ok, Ready},
    Future,
};

use crate::{auth::{claims_from_headers, Role}, errors::ServerError};

pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(required_roles: &[Role]) -> Self {
        AclMiddlewareFactory { required_roles: required_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let claims = claims_from_headers(req.headers()).map_err(ServerError::from)?;
            if claims.has_roles(&required_roles) {
                service.call(req).await
            } else {
                log::debug!(
                    "🔐️ {} lacks the required roles for {}",
                    claims.user_id,
                    req.path()
                );
                Err(ServerError::InsufficientPermissions(format!(
                    "This endpoint requires the following roles: {}",
                    required_roles.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ")
                ))
                .into())
            }
        })
    }
}
