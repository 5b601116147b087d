pub(crate) mod http;

#[doc(hidden)]
pub mod test_support;
