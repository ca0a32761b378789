use serde_json::{Map, Value};

use crate::container::Container;
use crate::vocab::{ANNOTATION_TYPE, ANNO_CONTEXT};

/// Expand a stored annotation into its LDP representation.
///
/// Client-supplied `@context` and `type` win over the defaults; `id` and
/// every other field pass through untouched. `partOf` always describes the
/// container the annotation was read from.
pub fn expand_annotation(mut annotation: Map<String, Value>, container: &Container) -> Value {
    annotation
        .entry("@context")
        .or_insert_with(|| Value::from(ANNO_CONTEXT));
    annotation
        .entry("type")
        .or_insert_with(|| Value::from(ANNOTATION_TYPE));
    annotation.insert("partOf".into(), container.describe());
    Value::Object(annotation)
}
