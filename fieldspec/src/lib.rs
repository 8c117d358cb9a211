//! Field descriptors for declarative data models.
//!
//! Every attribute of a model is described by a [`FieldInfo`]: its declared type, default
//! policy, aliases and constraint metadata. Descriptors are produced from the declaration
//! site through one of the entry points on [`FieldInfo`] or the public [`Field`] builder;
//! private attributes and computed fields have descriptors of their own.
//!
//! ```
//! use fieldspec::{Field, FieldInfo, TypeExpr};
//! use serde_json::json;
//!
//! let explicit = Field::with_default(json!(0)).ge(0).build().unwrap();
//! let info = FieldInfo::from_annotated_attribute(TypeExpr::parse("int").unwrap(), explicit).unwrap();
//! assert!(!info.is_required());
//! assert_eq!(info.metadata.len(), 1);
//! ```

pub mod alias;
pub mod annotation;
pub mod computed;
pub mod constraints;
pub mod dataclass;
pub mod declaration;
pub mod errors;
pub mod field;
pub mod fields;
pub mod private_attr;
pub mod types;
pub mod value;

pub use alias::{AliasChoice, AliasChoices, AliasPath, PathSegment, ValidationAlias};
pub use annotation::{AnnotationArg, SplitAnnotation, split_annotation};
pub use computed::{ComputedField, ComputedFieldInfo, computed_field};
pub use constraints::{Bound, ConstraintKeywords, GeneralMetadata, Metadata, collect_metadata};
pub use dataclass::DataclassField;
pub use declaration::{DeclarationError, ModelDeclaration, ResolvedModel};
pub use errors::*;
pub use field::{Field, LegacyOptions};
pub use fields::{AttributeDefault, DEFAULT_ALIAS_PRIORITY, FieldInfo, FieldParams};
pub use private_attr::{ModelPrivateAttr, OwnerAttachable, PrivateAttr, PrivateValue};
pub use types::{Namespace, TypeExpr, TypevarsMap};
pub use value::{DefaultFactory, DefaultInput};
