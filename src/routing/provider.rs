//! Context adaptation.
//!
//! A method declares either the raw [`Context`] or the application's single
//! custom context. The matching provider is chosen once per method when its
//! handler is synthesized.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::http::request::{ApiContext, Context};

type Wrap = dyn Fn(Context) -> Box<dyn Any + Send> + Send + Sync;

/// The application's custom context type and its wrapping function.
#[derive(Clone)]
pub struct CustomContext {
    type_id: TypeId,
    type_name: &'static str,
    wrap: Arc<Wrap>,
}

impl CustomContext {
    pub fn new<C, F>(wrap: F) -> Self
    where
        C: ApiContext,
        F: Fn(Context) -> C + Send + Sync + 'static,
    {
        Self {
            type_id: TypeId::of::<C>(),
            type_name: type_name::<C>(),
            wrap: Arc::new(move |ctx: Context| -> Box<dyn Any + Send> { Box::new(wrap(ctx)) }),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for CustomContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomContext")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Turns the raw context into the value a method declared.
#[derive(Debug, Clone)]
pub enum ContextProvider {
    /// Pass the raw context through.
    Identity,
    /// Wrap it into the registered custom context.
    CustomWrap(CustomContext),
}

impl ContextProvider {
    pub fn adapt(&self, ctx: Context) -> Box<dyn Any + Send> {
        match self {
            ContextProvider::Identity => Box::new(ctx),
            ContextProvider::CustomWrap(custom) => (custom.wrap)(ctx),
        }
    }
}
