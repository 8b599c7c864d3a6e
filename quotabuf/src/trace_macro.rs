#[cfg(feature = "trace")]
macro_rules! quotabuf_trace {
    ($($arg:tt)*) => {
        ::tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "trace"))]
macro_rules! quotabuf_trace {
    ($($arg:tt)*) => {};
}
