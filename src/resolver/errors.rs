/// Terminal resolution failures, the only errors a resolver caller sees.
///
/// The `Display` form is the envelope's `error` string.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    #[error("invalid-url")]
    InvalidUrl,

    #[error("no-embeddable-media")]
    NoEmbeddableMedia,
}
