pub trait OptionExt<T> {
    fn when<F>(cond: bool, fa: F) -> Option<T>
    where
        F: FnOnce() -> T;
}

impl<T> OptionExt<T> for Option<T> {
    fn when<F>(cond: bool, fa: F) -> Option<T>
    where
        F: FnOnce() -> T,
    {
        if cond {
            Some(fa())
        } else {
            None
        }
    }
}

/// Treats blank labels as absent.
pub trait LabelExt {
    fn non_blank(&self) -> Option<&str>;
}

impl LabelExt for str {
    fn non_blank(&self) -> Option<&str> {
        Option::when(!self.trim().is_empty(), || self)
    }
}

impl LabelExt for Option<String> {
    fn non_blank(&self) -> Option<&str> {
        self.as_deref().and_then(LabelExt::non_blank)
    }
}
