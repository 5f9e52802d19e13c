//! Callback tokens
//!
//! A scripting function cannot cross into native code. What crosses instead
//! is a [`CallbackToken`]: an opaque handle that, when invoked, asks a
//! [`CallbackDispatch`] to run the function later on the scripting thread.

use crate::error::InvocationError;
use crate::native::NativeValue;
use crate::script::FunctionRef;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tether_core::IdGenerator;

static TOKEN_IDS: IdGenerator = IdGenerator::new();

/// Unique identifier for a callback token
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenId(u64);

impl TokenId {
    /// Allocate a new unique token id
    pub fn new() -> Self {
        Self(TOKEN_IDS.next().to_bits())
    }

    /// Get the raw id value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for TokenId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token#{}", self.0)
    }
}

/// Identifies the invocation a token or completion belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Correlation(u64);

impl Correlation {
    /// No owning invocation
    pub const NONE: Self = Self(0);

    /// Wrap a raw correlation id
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw id
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Correlation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How many times a token may be invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPolicy {
    /// Exactly once; further invocations are reported and dropped
    #[default]
    SingleUse,
    /// Any number of times
    MultiUse,
}

/// A token invocation on its way to the scripting thread
#[derive(Debug, Clone)]
pub struct TokenInvocation {
    pub token: TokenId,
    pub correlation: Correlation,
    pub function: FunctionRef,
    pub args: Vec<NativeValue>,
}

/// Receives token invocations and misuse reports.
///
/// Implementations must be callable from any thread and must not run
/// scripting code inline.
pub trait CallbackDispatch: Send + Sync {
    /// Queue an invocation for the scripting thread
    fn dispatch(&self, invocation: TokenInvocation);

    /// Report token misuse
    fn report(&self, error: InvocationError);

    /// A token owned by `correlation` was created
    fn token_created(&self, _correlation: Correlation) {}

    /// The last clone of a token owned by `correlation` was dropped
    fn token_dropped(&self, _correlation: Correlation) {}
}

/// Dispatch used when values are marshalled outside of any bridge.
///
/// Invocations have nowhere to go and are dropped with a warning.
#[derive(Debug, Default)]
pub struct DetachedDispatch;

impl CallbackDispatch for DetachedDispatch {
    fn dispatch(&self, invocation: TokenInvocation) {
        log::warn!(
            "Dropping invocation of {} ({}): token is not attached to a bridge",
            invocation.function,
            invocation.token
        );
    }

    fn report(&self, error: InvocationError) {
        log::error!("{}", error);
    }
}

struct TokenInner {
    id: TokenId,
    function: FunctionRef,
    policy: TokenPolicy,
    correlation: Correlation,
    consumed: AtomicBool,
    invocations: AtomicU64,
    dispatch: Arc<dyn CallbackDispatch>,
}

impl Drop for TokenInner {
    fn drop(&mut self) {
        self.dispatch.token_dropped(self.correlation);
    }
}

/// Native-side stand-in for a scripting function.
///
/// Clones share state: consuming a single-use token through one clone
/// consumes it for all of them. Equality is token identity.
#[derive(Clone)]
pub struct CallbackToken {
    inner: Arc<TokenInner>,
}

impl CallbackToken {
    /// Wrap a scripting function
    pub fn new(
        function: FunctionRef,
        policy: TokenPolicy,
        correlation: Correlation,
        dispatch: Arc<dyn CallbackDispatch>,
    ) -> Self {
        dispatch.token_created(correlation);
        Self {
            inner: Arc::new(TokenInner {
                id: TokenId::new(),
                function,
                policy,
                correlation,
                consumed: AtomicBool::new(false),
                invocations: AtomicU64::new(0),
                dispatch,
            }),
        }
    }

    /// Get the token id
    pub fn id(&self) -> TokenId {
        self.inner.id
    }

    /// The scripting function this token stands for
    pub fn function(&self) -> FunctionRef {
        self.inner.function
    }

    /// Get the invocation policy
    pub fn policy(&self) -> TokenPolicy {
        self.inner.policy
    }

    /// The invocation that created this token
    pub fn correlation(&self) -> Correlation {
        self.inner.correlation
    }

    /// Whether a single-use token has been used up
    pub fn is_consumed(&self) -> bool {
        self.inner.consumed.load(Ordering::Acquire)
    }

    /// Number of successful invocations so far
    pub fn invocation_count(&self) -> u64 {
        self.inner.invocations.load(Ordering::Relaxed)
    }

    /// Invoke the scripting function with the given arguments.
    ///
    /// The call is queued, not executed. A second invocation of a single-use
    /// token is reported to the dispatcher and returns
    /// [`InvocationError::TokenConsumed`]; the first delivery is unaffected.
    pub fn invoke(&self, args: Vec<NativeValue>) -> Result<(), InvocationError> {
        let inner = &self.inner;
        if inner.policy == TokenPolicy::SingleUse && inner.consumed.swap(true, Ordering::AcqRel) {
            let error = InvocationError::TokenConsumed {
                token: inner.id,
                function: inner.function,
            };
            inner.dispatch.report(error.clone());
            return Err(error);
        }

        inner.invocations.fetch_add(1, Ordering::Relaxed);
        inner.dispatch.dispatch(TokenInvocation {
            token: inner.id,
            correlation: inner.correlation,
            function: inner.function,
            args,
        });
        Ok(())
    }
}

impl PartialEq for CallbackToken {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for CallbackToken {}

impl fmt::Debug for CallbackToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackToken")
            .field("id", &self.inner.id)
            .field("function", &self.inner.function)
            .field("policy", &self.inner.policy)
            .field("consumed", &self.is_consumed())
            .finish()
    }
}
