//! LargeOpt Registry - keyed storage for oversized configuration values
//!
//! Values that would overflow the host's configuration store are kept as
//! individual documents in a [`largeopt_store::DocumentStore`], one per
//! sanitized option name.
//!
//! - [`NameSanitizer`]: raw name to [`CanonicalKey`], memoized
//! - [`DocumentLocator`]: canonical key to document id, cached in-process
//!   and in a shared cache
//! - [`ValuePayloadStore`]: value in the document body or in an attached
//!   field, chosen per call
//! - [`LargeOptionRegistry`]: add/update/delete/get with host-config
//!   fallback and [`Hooks`] for filters and notifications

pub mod hooks;
pub mod host;
pub mod locator;
pub mod payload;
pub mod registry;
pub mod sanitize;

pub use hooks::{EventKind, Hooks, OptionEvent, Scope};
pub use host::{HostConfig, MapHostConfig, NoHostConfig};
pub use locator::{CACHE_KEY_PREFIX, DocumentLocator, LocatorStats};
pub use payload::{VALUE_FIELD, ValuePayloadStore};
pub use registry::{DEFAULT_KIND, LargeOptionRegistry, RegistryBuilder};
pub use sanitize::{CanonicalKey, DashSlugger, NameSanitizer, Slugger};
