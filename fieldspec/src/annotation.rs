//! Splitting annotated composites into a bare type plus extra metadata.

use std::fmt;

use crate::constraints::Metadata;
use crate::errors::{ConfigResult, ConfigurationError};
use crate::fields::FieldInfo;
use crate::types::TypeExpr;

/// Extra value attached to an annotated composite.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationArg {
    /// A field descriptor embedded in the annotation (`Annotated[int, Field(gt=1)]`).
    Field(Box<FieldInfo>),
    Metadata(Metadata),
}

impl From<Metadata> for AnnotationArg {
    fn from(value: Metadata) -> Self {
        Self::Metadata(value)
    }
}

impl From<FieldInfo> for AnnotationArg {
    fn from(value: FieldInfo) -> Self {
        Self::Field(Box::new(value))
    }
}

impl fmt::Display for AnnotationArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(info) => write!(f, "{info}"),
            Self::Metadata(metadata) => write!(f, "{metadata}"),
        }
    }
}

/// Result of splitting a declared annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitAnnotation {
    pub annotation: TypeExpr,
    pub metadata: Vec<Metadata>,
    pub field_info: Option<FieldInfo>,
    pub is_final: bool,
}

/// Strips one level of `Final[...]`. Bare `Final` is kept as the annotation.
pub fn unwrap_final(annotation: TypeExpr) -> (TypeExpr, bool) {
    match annotation {
        TypeExpr::Final(Some(inner)) => (*inner, true),
        TypeExpr::Final(None) => (TypeExpr::Final(None), true),
        other => (other, false),
    }
}

/// Splits `annotation` into its base type, metadata, and at most one embedded descriptor.
///
/// `Final` is detected both outside and inside the composite.
pub fn split_annotation(annotation: TypeExpr) -> ConfigResult<SplitAnnotation> {
    let (annotation, outer_final) = unwrap_final(annotation);

    let TypeExpr::Annotated { base, extras } = annotation else {
        return Ok(SplitAnnotation {
            annotation,
            metadata: Vec::new(),
            field_info: None,
            is_final: outer_final,
        });
    };

    let (base, inner_final) = unwrap_final(*base);
    let mut field_info = None;
    let mut metadata = Vec::with_capacity(extras.len());

    for extra in extras {
        match extra {
            AnnotationArg::Field(info) => {
                if field_info.is_some() {
                    return Err(ConfigurationError::duplicate("field descriptor specified twice"));
                }
                field_info = Some(*info);
            }
            AnnotationArg::Metadata(item) => metadata.push(item),
        }
    }

    Ok(SplitAnnotation {
        annotation: base,
        metadata,
        field_info,
        is_final: outer_final || inner_final,
    })
}

/// Finds the single field descriptor among `extras`, if any.
pub fn find_field_info(extras: &[AnnotationArg]) -> ConfigResult<Option<&FieldInfo>> {
    let mut found = extras.iter().filter_map(|extra| match extra {
        AnnotationArg::Field(info) => Some(info.as_ref()),
        AnnotationArg::Metadata(_) => None,
    });

    let first = found.next();
    if found.next().is_some() {
        return Err(ConfigurationError::duplicate("field descriptor specified twice"));
    }
    Ok(first)
}

/// Splits an annotation that must not embed a field descriptor.
///
/// Returns the base type, the extracted metadata, and whether a `Final` wrapper was seen.
pub fn extract_metadata(annotation: Option<TypeExpr>) -> ConfigResult<(Option<TypeExpr>, Vec<Metadata>, bool)> {
    let Some(annotation) = annotation else {
        return Ok((None, Vec::new(), false));
    };

    let split = split_annotation(annotation)?;
    if split.field_info.is_some() {
        return Err(ConfigurationError::duplicate("Field may not be used twice on the same field"));
    }
    Ok((Some(split.annotation), split.metadata, split.is_final))
}
