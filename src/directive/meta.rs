use crate::directive::ModifierDirective;

/// `$meta`: attaches metadata to a template object without affecting its
/// output.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetaDirective;

impl ModifierDirective for MetaDirective {
    fn name(&self) -> &str {
        "$meta"
    }
}
