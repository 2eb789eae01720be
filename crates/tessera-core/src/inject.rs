//! Values flowing from providers into consumer fields.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::InjectionError;
use crate::types::TypeInfo;

// ─── Provided ─────────────────────────────────────────────────────────────────

/// A type-erased value produced by a provider, tagged with its type.
#[derive(Clone)]
pub struct Provided {
    value: Arc<dyn Any + Send + Sync>,
    type_info: TypeInfo,
}

impl Provided {
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps an already shared value without cloning it.
    pub fn from_arc<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            value,
            type_info: TypeInfo::of::<T>(),
        }
    }

    pub fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    /// Returns the value if it is a `T`.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }
}

impl fmt::Debug for Provided {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provided")
            .field("type", &self.type_info.name())
            .finish_non_exhaustive()
    }
}

// ─── Injected<T> ──────────────────────────────────────────────────────────────

/// A write-once field slot filled by the injection orchestrator.
///
/// Plugins are shared behind `Arc` once constructed, so slots use interior
/// mutability.  A slot is either empty (provider missing at injection time)
/// or holds exactly one value for the rest of the process.
pub struct Injected<T> {
    slot: OnceLock<Arc<T>>,
}

impl<T> Injected<T> {
    pub const fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    /// The injected value, or `None` if injection did not happen.
    pub fn get(&self) -> Option<&T> {
        self.slot.get().map(Arc::as_ref)
    }

    /// The injected value as a shared handle.
    pub fn shared(&self) -> Option<Arc<T>> {
        self.slot.get().cloned()
    }

    pub fn is_set(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl<T: Send + Sync + 'static> Injected<T> {
    /// Stores `value` into the slot.
    pub fn fill(&self, field: &str, value: Provided) -> Result<(), InjectionError> {
        let found = value.type_info().name();
        let typed = value
            .downcast::<T>()
            .ok_or_else(|| InjectionError::TypeMismatch {
                field: field.to_string(),
                expected: std::any::type_name::<T>(),
                found,
            })?;
        self.slot
            .set(typed)
            .map_err(|_| InjectionError::AlreadyInjected {
                field: field.to_string(),
            })
    }
}

impl<T> Default for Injected<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Injected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(v) => f.debug_tuple("Injected").field(v).finish(),
            None => f.write_str("Injected(<unset>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_once() {
        let slot: Injected<String> = Injected::new();
        assert!(slot.get().is_none());
        slot.fill("name", Provided::new("tessera".to_string())).unwrap();
        assert_eq!(slot.get().map(String::as_str), Some("tessera"));

        let again = slot.fill("name", Provided::new("other".to_string()));
        assert!(matches!(again, Err(InjectionError::AlreadyInjected { .. })));
        assert_eq!(slot.get().map(String::as_str), Some("tessera"));
    }

    #[test]
    fn test_fill_type_mismatch() {
        let slot: Injected<u32> = Injected::new();
        let err = slot.fill("port", Provided::new("8080")).unwrap_err();
        assert!(matches!(err, InjectionError::TypeMismatch { .. }));
        assert!(!slot.is_set());
    }

    #[test]
    fn test_provided_shares_value() {
        let shared = Arc::new(vec![1, 2, 3]);
        let provided = Provided::from_arc(Arc::clone(&shared));
        let back = provided.downcast::<Vec<i32>>().unwrap();
        assert!(Arc::ptr_eq(&shared, &back));
        assert!(provided.downcast::<String>().is_none());
    }
}
