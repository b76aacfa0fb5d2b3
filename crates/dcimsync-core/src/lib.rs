pub mod definition;
pub mod error;
pub mod kind;
pub mod schema;
pub mod slug;
pub mod time;

pub use definition::{ComponentTemplate, Definition, DefinitionMeta};
pub use error::{CoreError, Result};
pub use kind::{ComponentKind, EntityKind};
pub use schema::{
    FieldDefault, FieldSpec, NormalizedPayload, Normalizer, RefTarget, ReferenceSpec, Schema,
    parse_bool,
};
pub use slug::{model_slug, slugify};
pub use time::{now_rfc3339, timestamp};
