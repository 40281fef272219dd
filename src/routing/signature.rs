//! Method signature classification.
//!
//! # Responsibilities
//! - Describe a method's parameter and return slots by type identity
//! - Decide whether a method is routable and under which call convention
//!
//! # Design Decisions
//! - Classification runs once at set-up; request handling never inspects types
//! - Ineligible shapes are not errors: helpers coexist with routed methods
//! - The receiver slot, when present, is discounted before counting parameters

use std::any::{type_name, TypeId};
use std::fmt;

use crate::http::request::Context;

/// Identity of one parameter or return slot.
#[derive(Clone, Copy)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Ordered parameter and return slots of one method.
///
/// When `receiver` is set, `params[0]` is the receiver type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub receiver: bool,
    pub params: Vec<TypeInfo>,
    pub returns: Vec<TypeInfo>,
}

impl MethodSignature {
    pub fn new(receiver: bool, params: Vec<TypeInfo>, returns: Vec<TypeInfo>) -> Self {
        Self {
            receiver,
            params,
            returns,
        }
    }

    /// Parameter count, receiver excluded.
    pub fn arity(&self) -> usize {
        self.params.len().saturating_sub(usize::from(self.receiver))
    }

    /// First parameter after the receiver.
    pub fn first_param(&self) -> Option<&TypeInfo> {
        self.params.get(usize::from(self.receiver))
    }
}

/// Shape a routable method takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallConvention {
    /// `(ctx)`: the method writes its own response.
    ContextOnly,
    /// `(ctx, request)`: the request is bound and validated first.
    ContextAndRequest,
}

impl CallConvention {
    pub fn param_count(self) -> usize {
        match self {
            CallConvention::ContextOnly => 1,
            CallConvention::ContextAndRequest => 2,
        }
    }
}

/// Which context a method's first parameter declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Raw,
    Custom,
}

/// Result of inspecting one signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub arity: usize,
    pub context: Option<ContextKind>,
}

impl Classification {
    /// Call convention, or `None` when the method is not routable.
    pub fn convention(&self) -> Option<CallConvention> {
        self.context?;
        match self.arity {
            1 => Some(CallConvention::ContextOnly),
            2 => Some(CallConvention::ContextAndRequest),
            _ => None,
        }
    }
}

/// Inspect `signature` against the raw context and the registered custom context.
pub fn classify(signature: &MethodSignature, custom: Option<TypeId>) -> Classification {
    let context = signature.first_param().and_then(|first| {
        if first.id() == TypeId::of::<Context>() {
            Some(ContextKind::Raw)
        } else if Some(first.id()) == custom {
            Some(ContextKind::Custom)
        } else {
            None
        }
    });

    Classification {
        arity: signature.arity(),
        context,
    }
}
