//! Type handles, exchange contracts and pipeline points.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

// ─── TypeInfo ─────────────────────────────────────────────────────────────────

/// A comparable handle to a Rust type that can be built in `const` context.
///
/// `TypeId::of` and `type_name` are not yet usable in constants, so both are
/// stored as function pointers and resolved on demand.  Equality and hashing
/// only consider the `TypeId`.
#[derive(Clone, Copy)]
pub struct TypeInfo {
    id: fn() -> TypeId,
    name: fn() -> &'static str,
}

impl TypeInfo {
    /// Returns the handle for `T`.
    pub const fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>,
            name: std::any::type_name::<T>,
        }
    }

    /// The underlying `TypeId`.
    pub fn id(&self) -> TypeId {
        (self.id)()
    }

    /// The fully qualified type name, for diagnostics only.
    pub fn name(&self) -> &'static str {
        (self.name)()
    }

    /// Returns `true` if a value of this type can be stored in a slot
    /// declared with `target`.
    ///
    /// Concrete Rust types have no implicit subtyping, so this is identity.
    pub fn is_assignable_to(&self, target: &TypeInfo) -> bool {
        self.id() == target.id()
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeInfo").field(&self.name()).finish()
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Exchange contracts ───────────────────────────────────────────────────────

/// Marker type for raw, unparsed request/response bodies.
///
/// Traffic that is not handled by a service (e.g. proxied requests) is
/// exchanged as raw bytes; interceptors that want to see it declare
/// [`Contract::byte_stream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteStream;

/// One side of an exchange contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeType {
    /// Wildcard: matches any exchange type.
    Any,
    /// A concrete exchange type.
    Of(TypeInfo),
}

impl ExchangeType {
    /// Returns `true` if `self` accepts an exchange of type `other`.
    pub fn accepts(&self, other: &ExchangeType) -> bool {
        match (self, other) {
            (ExchangeType::Any, _) => true,
            (ExchangeType::Of(a), ExchangeType::Of(b)) => a == b,
            (ExchangeType::Of(_), ExchangeType::Any) => false,
        }
    }
}

/// The request/response types a service produces or an interceptor consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Contract {
    pub request: ExchangeType,
    pub response: ExchangeType,
}

impl Contract {
    /// Wildcard contract: an interceptor declaring it runs for every service.
    pub const ANY: Contract = Contract {
        request: ExchangeType::Any,
        response: ExchangeType::Any,
    };

    /// Contract with concrete request and response types.
    pub const fn of<Req: ?Sized + 'static, Res: ?Sized + 'static>() -> Self {
        Self {
            request: ExchangeType::Of(TypeInfo::of::<Req>()),
            response: ExchangeType::Of(TypeInfo::of::<Res>()),
        }
    }

    /// Contract used for traffic not handled by any service.
    pub const fn byte_stream() -> Self {
        Self::of::<ByteStream, ByteStream>()
    }

    /// Returns `true` if an interceptor declaring `self` may run on an
    /// exchange described by `target`.
    pub fn accepts(&self, target: &Contract) -> bool {
        self.request.accepts(&target.request) && self.response.accepts(&target.response)
    }
}

// ─── Pipeline points ──────────────────────────────────────────────────────────

/// A named stage in request processing at which an interceptor may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterceptPoint {
    RequestBeforeExchangeInit,
    RequestBeforeAuth,
    RequestAfterAuth,
    RequestAfterFailedAuth,
    Response,
    ResponseAsync,
}

impl InterceptPoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestBeforeExchangeInit => "request_before_exchange_init",
            Self::RequestBeforeAuth => "request_before_auth",
            Self::RequestAfterAuth => "request_after_auth",
            Self::RequestAfterFailedAuth => "request_after_failed_auth",
            Self::Response => "response",
            Self::ResponseAsync => "response_async",
        }
    }
}

impl fmt::Display for InterceptPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When an initializer runs relative to host startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitPoint {
    /// Before the host starts accepting requests.
    BeforeStartup,
    /// After the host has started.
    AfterStartup,
}

impl fmt::Display for InitPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeforeStartup => f.write_str("before_startup"),
            Self::AfterStartup => f.write_str("after_startup"),
        }
    }
}
