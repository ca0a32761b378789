/// JSON-LD context of the Web Annotation data model.
pub const ANNO_CONTEXT: &str = "http://www.w3.org/ns/anno.jsonld";

/// Default `type` of an annotation.
pub const ANNOTATION_TYPE: &str = "Annotation";

/// Types of an annotation collection exposed as an LDP container.
pub const CONTAINER_TYPES: [&str; 2] = ["BasicContainer", "AnnotationCollection"];

/// Media type of annotation responses.
pub const ANNO_MEDIA_TYPE: &str =
    "application/ld+json; profile=\"http://www.w3.org/ns/anno.jsonld\"";

/// `Link` header value marking a response as an LDP resource.
pub const LDP_RESOURCE_LINK: &str = "<http://www.w3.org/ns/ldp#Resource>; rel=\"type\"";

/// Methods supported on a single annotation.
pub const ANNOTATION_ALLOW: &str = "GET,HEAD,OPTIONS,DELETE";
