//! Composition of the decorated services over one repository bundle.

use custos_auth::{AuthConfig, AuthService};
use custos_core::repository::Repositories;

use crate::authorization::AuthorizationProvider;
use crate::decorator::{Authorized, Logged};
use crate::processor::Processors;
use crate::service::{Deregistration, Modification, Registration, Retrieval};

/// A service behind the logging and authorization wrappers.
pub type Layered<S, R> = Authorized<Logged<S>, R>;

/// Wraps `service` as `Authorized -> Logged -> service`.
pub fn layer<S, R: Repositories>(service: S, repos: &R) -> Layered<S, R> {
    Authorized::new(Logged::new(service), AuthorizationProvider::new(repos.clone()))
}

/// Every public service, fully decorated, over one repository bundle.
#[derive(Clone)]
pub struct IamStack<R: Repositories> {
    pub registration: Layered<Registration<R>, R>,
    pub deregistration: Layered<Deregistration<R>, R>,
    pub modification: Layered<Modification<R>, R>,
    pub retrieval: Layered<Retrieval<R>, R>,
    pub authentication: Layered<AuthService<R>, R>,
}

impl<R: Repositories> IamStack<R> {
    pub fn new(repos: R, auth: AuthConfig) -> Self {
        let processors = Processors::new(repos.clone(), auth.pepper.clone());
        Self {
            registration: layer(Registration::new(repos.clone(), processors.clone()), &repos),
            deregistration: layer(Deregistration::new(repos.clone(), processors.clone()), &repos),
            modification: layer(Modification::new(repos.clone(), processors.clone()), &repos),
            retrieval: layer(Retrieval::new(repos.clone(), processors), &repos),
            authentication: layer(AuthService::new(repos.clone(), auth), &repos),
        }
    }
}
