//! Sample controllers served by the `autoroute` binary.
//!
//! `Hello` uses the raw [`Context`]; `Users` uses [`AppContext`], the
//! application's custom context, which carries the caller's tenant.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use crate::http::request::{ApiContext, Context};
use crate::routing::{MethodTable, RegisterError, Registrar, Routable};

/// Header naming the tenant a request acts for.
pub const TENANT_HEADER: &str = "x-tenant";

/// Request context of the demo application.
pub struct AppContext {
    inner: Context,
    tenant: String,
}

impl AppContext {
    pub fn new(inner: Context) -> Self {
        let tenant = inner.header(TENANT_HEADER).unwrap_or("public").to_string();
        Self { inner, tenant }
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }
}

impl ApiContext for AppContext {
    fn context(&mut self) -> &mut Context {
        &mut self.inner
    }
}

#[derive(Debug, Default)]
pub struct Hello;

/// Who to greet.
#[derive(Debug, Deserialize, Validate)]
pub struct HelloRequest {
    /// caller name
    #[validate(length(min = 1, max = 32))]
    pub name: String,
    /// answer in upper case
    #[serde(default)]
    pub shout: bool,
}

#[derive(Debug, Serialize)]
pub struct HelloReply {
    pub message: String,
}

impl Hello {
    /// @Router /hello [get,post]
    /// hi greets the caller by name
    pub fn hi(&self, _ctx: &mut Context, req: HelloRequest) -> Result<HelloReply, String> {
        if req.name.eq_ignore_ascii_case("nobody") {
            return Err("nobody is not a name".to_string());
        }
        let message = format!("hello {}", req.name);
        Ok(HelloReply {
            message: if req.shout { message.to_uppercase() } else { message },
        })
    }

    /// ping answers with the request id
    pub fn ping(&self, ctx: &mut Context) {
        let request_id = ctx.request_id().to_string();
        ctx.text(StatusCode::OK, format!("pong {request_id}"));
    }
}

impl Routable for Hello {
    fn methods(table: &mut MethodTable<Self>) {
        crate::methods!(table; hi, ping);
    }
}

/// A new user.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    /// unique login
    #[validate(length(min = 3, max = 16))]
    pub user_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(range(min = 13, max = 130))]
    pub age: Option<u32>,
}

/// A stored user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: u64,
    pub tenant: String,
    pub user_name: String,
    pub email: String,
    pub age: Option<u32>,
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user name {0} is taken")]
    Taken(String),
}

/// In-memory users, partitioned by tenant.
#[derive(Debug, Default)]
pub struct Users {
    next_id: AtomicU64,
    store: RwLock<BTreeMap<u64, UserView>>,
}

impl Users {
    /// @Router /users [post]
    /// create adds a user to the caller's tenant
    pub fn create(&self, ctx: &mut AppContext, req: CreateUser) -> Result<UserView, UserError> {
        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        if store
            .values()
            .any(|u| u.tenant == ctx.tenant() && u.user_name == req.user_name)
        {
            return Err(UserError::Taken(req.user_name));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let user = UserView {
            id,
            tenant: ctx.tenant().to_string(),
            user_name: req.user_name,
            email: req.email,
            age: req.age,
        };
        store.insert(id, user.clone());
        Ok(user)
    }

    /// @Router /users/:id [get]
    /// get looks a user up by id
    pub fn get(&self, ctx: &mut AppContext) {
        let tenant = ctx.tenant().to_string();
        let found = ctx
            .context()
            .param("id")
            .and_then(|id| id.parse::<u64>().ok())
            .and_then(|id| {
                let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
                store.get(&id).filter(|u| u.tenant == tenant).cloned()
            });

        match found {
            Some(user) => ctx.context().json(StatusCode::OK, &user),
            None => ctx.context().status(StatusCode::NOT_FOUND),
        }
    }

    /// list returns every user of the caller's tenant
    pub fn list(&self, ctx: &mut AppContext) {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        let users: Vec<&UserView> = store.values().filter(|u| u.tenant == ctx.tenant()).collect();
        ctx.context().json(StatusCode::OK, &users);
    }
}

impl Routable for Users {
    fn methods(table: &mut MethodTable<Self>) {
        crate::methods!(table; create, get, list);
    }
}

/// Declare [`AppContext`] on `registrar`.
pub fn with_app_context(registrar: Registrar) -> Registrar {
    registrar.with_custom_context(AppContext::new)
}

/// Register every demo controller.
pub fn register(registrar: &mut Registrar) -> Result<usize, RegisterError> {
    let mut mounted = registrar.register(Arc::new(Hello))?;
    mounted += registrar.register(Arc::new(Users::default()))?;
    Ok(mounted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::Request;

    fn ctx(tenant: Option<&str>) -> Context {
        let mut builder = Request::builder();
        if let Some(tenant) = tenant {
            builder = builder.header(TENANT_HEADER, tenant);
        }
        Context::from(builder.body(Bytes::new()).unwrap())
    }

    #[test]
    fn test_users_are_partitioned_by_tenant() {
        let users = Users::default();
        let mut acme = AppContext::new(ctx(Some("acme")));
        let mut public = AppContext::new(ctx(None));
        assert_eq!(public.tenant(), "public");

        let request = || CreateUser {
            user_name: "ann".into(),
            email: "ann@example.com".into(),
            age: None,
        };
        let created = users.create(&mut acme, request()).unwrap();
        assert_eq!(created.id, 1);
        assert_eq!(created.tenant, "acme");

        assert!(matches!(users.create(&mut acme, request()), Err(UserError::Taken(_))));
        assert!(users.create(&mut public, request()).is_ok());
    }

    #[test]
    fn test_hello_shout() {
        let reply = Hello
            .hi(
                &mut ctx(None),
                HelloRequest {
                    name: "ann".into(),
                    shout: true,
                },
            )
            .unwrap();
        assert_eq!(reply.message, "HELLO ANN");
        assert!(Hello
            .hi(
                &mut ctx(None),
                HelloRequest {
                    name: "Nobody".into(),
                    shout: false,
                },
            )
            .is_err());
    }
}
