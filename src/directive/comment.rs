use crate::directive::ModifierDirective;

/// `$comment`: a note for template authors, stripped from output.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommentDirective;

impl ModifierDirective for CommentDirective {
    fn name(&self) -> &str {
        "$comment"
    }
}
