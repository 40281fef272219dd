//! Method tables.
//!
//! Rust has no runtime method enumeration, so a routable object lists its
//! externally visible methods once in [`Routable::methods`]. Each entry keeps
//! the method's [`MethodSignature`] for classification and a type-erased call
//! built from the concrete function.
//!
//! ```ignore
//! impl Routable for User {
//!     fn methods(table: &mut MethodTable<Self>) {
//!         autoroute::methods!(table; get, hello, helper);
//!     }
//! }
//! ```

use std::any::{type_name, Any};
use std::sync::Arc;

use crate::http::binder::Bind;
use crate::http::request::ApiContext;
use crate::routing::handler::{ErasedCall, MethodReturn, Outcome};
use crate::routing::signature::{MethodSignature, TypeInfo};

/// An object whose methods can be mounted as routes.
pub trait Routable: Send + Sync + Sized + 'static {
    /// Object segment of default paths and of `object.method` keys.
    ///
    /// Defaults to the type name without module path or generics.
    fn object_name() -> &'static str {
        short_type_name(type_name::<Self>())
    }

    /// List every externally visible method, routable or not.
    fn methods(table: &mut MethodTable<Self>);
}

/// Strip module path and generic arguments from a type name.
pub fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Conversion of a concrete method into a signature and an erased call.
///
/// `M` is a marker that keeps the per-shape impls apart.
pub trait IntoMethod<T, M>: Send + Sync + 'static {
    fn into_parts(self) -> (MethodSignature, ErasedCall<T>);
}

/// Methods shaped `fn(&self, &mut C)`.
impl<T, C, F> IntoMethod<T, fn(C)> for F
where
    T: Send + Sync + 'static,
    C: ApiContext,
    F: Fn(&T, &mut C) + Send + Sync + 'static,
{
    fn into_parts(self) -> (MethodSignature, ErasedCall<T>) {
        let signature = MethodSignature::new(
            true,
            vec![TypeInfo::of::<T>(), TypeInfo::of::<C>()],
            Vec::new(),
        );
        let method = self;
        let call: ErasedCall<T> = Arc::new(move |receiver: &T, ctx: Box<dyn Any + Send>| {
            let Ok(mut ctx) = ctx.downcast::<C>() else {
                return Outcome::Misrouted(type_name::<C>());
            };
            method(receiver, &mut *ctx);
            Outcome::Written(ctx.context().take_response())
        });
        (signature, call)
    }
}

/// Methods shaped `fn(&self, &mut C, R) -> O` where `O` is `()` or `Result<V, E>`.
impl<T, C, R, O, F> IntoMethod<T, fn(C, R) -> O> for F
where
    T: Send + Sync + 'static,
    C: ApiContext,
    R: Bind + 'static,
    O: MethodReturn,
    F: Fn(&T, &mut C, R) -> O + Send + Sync + 'static,
{
    fn into_parts(self) -> (MethodSignature, ErasedCall<T>) {
        let signature = MethodSignature::new(
            true,
            vec![TypeInfo::of::<T>(), TypeInfo::of::<C>(), TypeInfo::of::<R>()],
            O::returns(),
        );
        let method = self;
        let call: ErasedCall<T> = Arc::new(move |receiver: &T, ctx: Box<dyn Any + Send>| {
            let Ok(mut ctx) = ctx.downcast::<C>() else {
                return Outcome::Misrouted(type_name::<C>());
            };
            let request = match R::bind(ctx.context()) {
                Ok(request) => request,
                Err(err) => return Outcome::Rejected(err),
            };
            let returned = method(receiver, &mut *ctx, request);
            returned.into_outcome(ctx.context())
        });
        (signature, call)
    }
}

/// One listed method.
pub struct MethodEntry<T> {
    name: &'static str,
    signature: MethodSignature,
    call: ErasedCall<T>,
}

impl<T> MethodEntry<T> {
    /// Entry with a hand-written signature, for shapes [`IntoMethod`] does not cover.
    pub fn new(name: &'static str, signature: MethodSignature, call: ErasedCall<T>) -> Self {
        Self {
            name,
            signature,
            call,
        }
    }

    pub fn from_fn<M, F>(name: &'static str, method: F) -> Self
    where
        F: IntoMethod<T, M>,
    {
        let (signature, call) = method.into_parts();
        Self::new(name, signature, call)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    pub(crate) fn call(&self) -> &ErasedCall<T> {
        &self.call
    }
}

/// The methods an object exposes, in declaration order.
pub struct MethodTable<T> {
    entries: Vec<MethodEntry<T>>,
}

impl<T> MethodTable<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn add<M, F>(&mut self, name: &'static str, method: F) -> &mut Self
    where
        F: IntoMethod<T, M>,
    {
        self.push(MethodEntry::from_fn(name, method))
    }

    pub fn push(&mut self, entry: MethodEntry<T>) -> &mut Self {
        self.entries.push(entry);
        self
    }

    pub fn entries(&self) -> &[MethodEntry<T>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for MethodTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Method table of `T`.
pub fn table_of<T: Routable>() -> MethodTable<T> {
    let mut table = MethodTable::new();
    T::methods(&mut table);
    table
}

/// Add `Self::name` under its own name for each listed method.
#[macro_export]
macro_rules! methods {
    ($table:expr; $($name:ident),* $(,)?) => {
        $( $table.add(stringify!($name), Self::$name); )*
    };
}
