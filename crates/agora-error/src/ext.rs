use crate::{Error, ErrorType};

mod sealed {
    pub trait Sealed {}

    impl<T, E> Sealed for Result<T, E> {}
    impl<T> Sealed for Option<T> {}
}

pub trait ResultExt<T>: sealed::Sealed {
    fn with_error_type(self, ty: ErrorType) -> Result<T, Error>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<Error>,
{
    #[inline]
    fn with_error_type(self, ty: ErrorType) -> Result<T, Error> {
        self.map_err(|err| err.into().with_error_type(ty))
    }
}

pub trait OptionExt<T>: sealed::Sealed {
    /// Turn a missing value into a [`ErrorType::NotFound`] error
    fn or_not_found(self, what: &'static str) -> Result<T, Error>;
}

impl<T> OptionExt<T> for Option<T> {
    #[inline]
    fn or_not_found(self, what: &'static str) -> Result<T, Error> {
        self.ok_or_else(|| Error::msg(format!("{what} not found")).with_error_type(ErrorType::NotFound))
    }
}
