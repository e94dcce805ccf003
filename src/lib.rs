//! Burnout Paradise `bnd2` bundle codec
//!
//! Packs and unpacks version-2 asset bundles: extraction writes every
//! resource's payloads as individual `.dat` files plus editable YAML
//! sidecars, and creation is the exact inverse.
//!
//! ## Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Header (0x30 bytes)                         │
//! │  - Magic "bnd2", version 2, platform        │
//! │  - Entry table + data plane offsets, flags  │
//! ├─────────────────────────────────────────────┤
//! │ Debug XML blob (optional, NUL-terminated)   │
//! ├─────────────────────────────────────────────┤
//! │ Resource entries (0x40 bytes each,          │
//! │ sorted ascending by id)                     │
//! ├─────────────────────────────────────────────┤
//! │ Plane 0: main memory payloads               │
//! │ Plane 1: secondary payloads                 │
//! │ Plane 2: tertiary payloads                  │
//! │  (each plane 0x80-aligned; imports ride as  │
//! │   a sub-table at the tail of plane 0)       │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Multi-byte integers use the target platform's byte order (PC is
//! little-endian, X360 and PS3 big-endian); the magic is raw bytes and is
//! never swapped. Payloads are opaque, optionally zlib-compressed blobs.
//!
//! - [`stream`] - endian-aware byte I/O parameterised by [`Platform`]
//! - [`compression`] - zlib encode/decode for resource payloads
//! - [`bundle`] - the in-memory model and its wire format
//! - [`types`] - the fixed resource type-tag enumeration
//! - [`validate`] - entry validation for damaged-media bundles
//! - [`sidecar`] - `.meta.yaml` / `.imports.yaml` parsing and emission
//! - [`extract`] - bundle file → directory
//! - [`create`] - directory → bundle file

pub mod bundle;
pub mod compression;
pub mod create;
pub mod error;
pub mod extract;
pub mod sidecar;
pub mod stream;
pub mod types;
pub mod validate;

pub use bundle::{Bundle, ImportEntry, ResourceEntry};
pub use create::{create, CreateOptions};
pub use error::{BundleError, Result};
pub use extract::{extract, ExtractOptions};
pub use stream::{DataStream, Platform};
