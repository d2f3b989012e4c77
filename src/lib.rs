//! Compiles a guided provisioning form into a vmadm instance payload.
//!
//! The guided form produces typed properties ([`field`]), from which a NIC
//! ([`nic`]), brand-conditional disks ([`disk`]) and metadata namespaces
//! ([`metadata`]) are derived. The result is reconciled with the operator's
//! free-form additional-properties JSON under a merge policy ([`merge`]) and
//! published through the three-pane editor workflow ([`editor`]). The
//! compiler is a pure function of its inputs; rendering, validation and
//! submission belong to the host.

pub mod brand;
pub mod compiler;
pub mod disk;
pub mod editor;
pub mod error;
pub mod field;
pub mod merge;
pub mod metadata;
pub mod nic;

pub use brand::Brand;
pub use compiler::{compile, CompileInput, CompileOutput, SuggestedField};
pub use disk::{DiskSpec, ImageInfo};
pub use editor::{EditorSession, GuidedForm, Pane, Transition};
pub use error::{PayloadError, Result};
pub use field::{encode_fields, FieldDescriptor, GuidedProperties, RawValue, TypeHint};
pub use merge::MergePolicy;
pub use nic::{AddressSetup, NicForm, NicSpec};
