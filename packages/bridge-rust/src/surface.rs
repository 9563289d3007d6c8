//! Method surfaces over a bridge.
//!
//! [`RemoteSurface`] is the dynamic form: any operation name yields a
//! [`RemoteMethod`]. [`remote_interface!`](crate::remote_interface) generates
//! a typed struct with one async method per declared operation.

use serde::de::DeserializeOwned;
use serde::Serialize;
use workerlink_core::{TransferList, Value};

use crate::bridge::{PendingCall, WorkerBridge};
use crate::error::{BridgeError, CallError};

// ---------------------------------------------------------------------------
// RemoteMethod
// ---------------------------------------------------------------------------

/// A reusable callable bound to one operation name.
#[derive(Debug, Clone)]
pub struct RemoteMethod {
    bridge: WorkerBridge,
    name: String,
    transfer: Option<TransferList>,
}

impl RemoteMethod {
    pub(crate) fn new(bridge: WorkerBridge, name: String, transfer: Option<TransferList>) -> Self {
        Self {
            bridge,
            name,
            transfer,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a copy of this method that transfers the listed arguments.
    #[must_use]
    pub fn with_transfer(mut self, transfer: TransferList) -> Self {
        self.transfer = Some(transfer);
        self
    }

    /// Sends the call with `args` forwarded verbatim.
    pub fn invoke(&self, args: Vec<Value>) -> PendingCall {
        match &self.transfer {
            Some(list) => self.bridge.call_with_transfer(self.name.clone(), args, list),
            None => self.bridge.call(self.name.clone(), args),
        }
    }
}

// ---------------------------------------------------------------------------
// RemoteSurface
// ---------------------------------------------------------------------------

/// Dynamic dispatch surface: every name is a callable operation.
///
/// The surface is read-only. Operations are resolved by name on the worker,
/// so there is nothing local to assign.
#[derive(Debug, Clone)]
pub struct RemoteSurface {
    bridge: WorkerBridge,
}

impl RemoteSurface {
    pub(crate) fn new(bridge: WorkerBridge) -> Self {
        Self { bridge }
    }

    /// Returns the callable for `name`. No round trip happens until it is
    /// invoked; unknown names are rejected by the worker.
    #[must_use]
    pub fn method(&self, name: impl Into<String>) -> RemoteMethod {
        self.bridge.operation(name, None)
    }

    /// Assignment is never allowed on a remote surface.
    ///
    /// # Errors
    ///
    /// Always returns [`BridgeError::ReadOnlySurface`].
    pub fn set(&self, property: impl Into<String>, _value: Value) -> Result<(), BridgeError> {
        Err(BridgeError::ReadOnlySurface {
            property: property.into(),
        })
    }

    #[must_use]
    pub fn bridge(&self) -> &WorkerBridge {
        &self.bridge
    }
}

// ---------------------------------------------------------------------------
// Typed conversion helpers used by `remote_interface!`
// ---------------------------------------------------------------------------

/// Serializes one typed argument into a payload value.
///
/// # Errors
///
/// Returns `CallError::Codec` if `arg` cannot be represented.
pub fn encode_arg<T: Serialize + ?Sized>(arg: &T) -> Result<Value, CallError> {
    rmpv::ext::to_value(arg).map_err(|e| CallError::Codec(e.to_string()))
}

/// Deserializes a success payload into the declared result type.
///
/// # Errors
///
/// Returns `CallError::Codec` if the payload does not match `T`.
pub fn decode_result<T: DeserializeOwned>(payload: Value) -> Result<T, CallError> {
    rmpv::ext::from_value(payload).map_err(|e| CallError::Codec(e.to_string()))
}

/// Generates a typed client struct over a [`WorkerBridge`].
///
/// Each declared operation becomes an async method that serializes its
/// arguments, calls the worker, and deserializes the result. A wire name can
/// follow `=>` when it differs from the Rust method name.
///
/// ```rust,ignore
/// workerlink::remote_interface! {
///     /// Arithmetic worker.
///     pub struct MathWorker {
///         fn add(a: i64, b: i64) -> i64;
///         fn throw_error() -> () => "throwError";
///     }
/// }
/// ```
///
/// The generated struct has `new(bridge)`, `bridge()`, and the declared
/// methods. It has no setters.
#[macro_export]
macro_rules! remote_interface {
    (@wire $method:ident $wire:literal) => {
        $wire
    };
    (@wire $method:ident) => {
        stringify!($method)
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                fn $method:ident ( $($arg:ident : $ty:ty),* $(,)? ) -> $ret:ty $(=> $wire:literal)? ;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            bridge: $crate::WorkerBridge,
        }

        impl $name {
            /// Wraps `bridge`.
            #[must_use]
            pub fn new(bridge: $crate::WorkerBridge) -> Self {
                Self { bridge }
            }

            /// The underlying bridge, for shutdown and event subscriptions.
            #[must_use]
            pub fn bridge(&self) -> &$crate::WorkerBridge {
                &self.bridge
            }

            $(
                $(#[$fmeta])*
                pub async fn $method(&self, $($arg: $ty),*) -> ::std::result::Result<$ret, $crate::CallError> {
                    let args: ::std::vec::Vec<$crate::Value> = vec![
                        $($crate::surface::encode_arg(&$arg)?),*
                    ];
                    let payload = self
                        .bridge
                        .call($crate::remote_interface!(@wire $method $($wire)?), args)
                        .await?;
                    $crate::surface::decode_result(payload)
                }
            )*
        }
    };
}
