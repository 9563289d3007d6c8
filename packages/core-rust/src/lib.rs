//! `workerlink` core: wire schemas, frame classification, and the `MsgPack` codec
//! shared by the caller-side bridge and worker-side dispatch loops.

pub mod classify;
pub mod codec;
pub mod messages;
pub mod transfer;
pub mod types;

pub use classify::{classify, ClassifyError, Inbound};
pub use codec::CodecError;
pub use messages::{EventMessage, EventPayload, RequestMessage, ResponseMessage};
pub use transfer::{Envelope, TransferError, TransferList, TransferredBuffer};
pub use types::{CallId, Value};
